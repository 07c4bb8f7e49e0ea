//! A small HTML node tree for handlers that build pages in code.
//!
//! Nodes are built by value and rendered either compactly with `Display` or
//! indented with [`HtmlNode::format`]. Text and attribute values are written
//! verbatim.

use std::fmt;

const INDENT: &str = "  ";
const LINE_END: &str = "\r\n";

/// One element or text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlNode {
    tag: String,
    attributes: Vec<(String, String)>,
    inner_text: String,
    children: Vec<HtmlNode>,
    closed: bool,
}

impl HtmlNode {
    /// An element that renders a closing tag.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: Vec::new(),
            inner_text: String::new(),
            children: Vec::new(),
            closed: true,
        }
    }

    /// An element rendered without a closing tag, such as `meta` or `input`.
    pub fn void(tag: &str) -> Self {
        Self {
            closed: false,
            ..Self::new(tag)
        }
    }

    /// A bare text node.
    pub fn text_node(text: &str) -> Self {
        Self {
            inner_text: text.to_string(),
            ..Self::new("")
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn children(&self) -> &[HtmlNode] {
        &self.children
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn is_text(&self) -> bool {
        self.tag.is_empty()
    }

    /// Set an attribute. Setting a name again replaces its value in place.
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
        self
    }

    pub fn remove_attr(mut self, name: &str) -> Self {
        self.attributes.retain(|(key, _)| key != name);
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Set the `class` attribute.
    pub fn clazz(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn src(self, src: &str) -> Self {
        self.attr("src", src)
    }

    pub fn href(self, href: &str) -> Self {
        self.attr("href", href)
    }

    pub fn style(self, style: &str) -> Self {
        self.attr("style", style)
    }

    pub fn value(self, value: &str) -> Self {
        self.attr("value", value)
    }

    /// Set the `type` attribute.
    pub fn kind(self, kind: &str) -> Self {
        self.attr("type", kind)
    }

    pub fn stylesheet(self) -> Self {
        self.attr("rel", "stylesheet")
    }

    /// Mark the element `disabled`, rendered as a bare attribute.
    pub fn disabled(self) -> Self {
        self.attr("disabled", "")
    }

    pub fn text(mut self, text: &str) -> Self {
        self.inner_text = text.to_string();
        self
    }

    pub fn child(mut self, node: HtmlNode) -> Self {
        self.children.push(node);
        self
    }

    pub fn with_children(mut self, nodes: impl IntoIterator<Item = HtmlNode>) -> Self {
        self.children.extend(nodes);
        self
    }

    fn write_attributes(&self, out: &mut String) {
        for (name, value) in &self.attributes {
            out.push(' ');
            if name == "disabled" {
                out.push_str(name);
            } else {
                out.push_str(&format!("{}=\"{}\"", name, value));
            }
        }
    }

    fn write_open(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        self.write_attributes(out);
        out.push('>');
    }

    fn write_close(&self, out: &mut String) {
        if self.closed {
            out.push_str("</");
            out.push_str(&self.tag);
            out.push('>');
        }
    }

    /// Indented rendering, two spaces per level and CRLF line ends.
    pub fn format(&self) -> String {
        let mut out = String::new();
        self.format_into(&mut out, 0);
        out
    }

    fn format_into(&self, out: &mut String, depth: usize) {
        if self.is_text() {
            out.push_str(&self.inner_text);
            out.push_str(LINE_END);
            return;
        }

        let indent = INDENT.repeat(depth);
        out.push_str(&indent);
        self.write_open(out);
        out.push_str(&self.inner_text);

        if self.children.is_empty() {
            self.write_close(out);
            out.push_str(LINE_END);
            return;
        }

        out.push_str(LINE_END);
        for child in &self.children {
            child.format_into(out, depth + 1);
        }
        out.push_str(&indent);
        self.write_close(out);
        out.push_str(LINE_END);
    }
}

impl fmt::Display for HtmlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_text() {
            return f.write_str(&self.inner_text);
        }
        let mut open = String::new();
        self.write_open(&mut open);
        f.write_str(&open)?;
        f.write_str(&self.inner_text)?;
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        let mut close = String::new();
        self.write_close(&mut close);
        f.write_str(&close)
    }
}

/// A whole document: a `head` and a `body` with helpers for common head content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlBuilder {
    head: HtmlNode,
    body: HtmlNode,
}

impl Default for HtmlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlBuilder {
    pub fn new() -> Self {
        Self {
            head: HtmlNode::new("head"),
            body: HtmlNode::new("body"),
        }
    }

    /// Add `<meta charset="utf-8">` to the head.
    pub fn utf8(self) -> Self {
        self.head_node(meta("charset", "utf-8"))
    }

    pub fn title(self, text: &str) -> Self {
        self.head_node(title(text))
    }

    pub fn meta(self, name: &str, value: &str) -> Self {
        self.head_node(meta(name, value))
    }

    /// Inline stylesheet in the head.
    pub fn css(self, css: &str) -> Self {
        self.head_node(style_sheet(css))
    }

    pub fn link_css(self, href: &str) -> Self {
        self.head_node(link_css(href))
    }

    /// External script in the head.
    pub fn script(self, url: &str) -> Self {
        self.head_node(script(url))
    }

    /// Inline script at the end of the body.
    pub fn inline_script(self, js: &str) -> Self {
        self.body_node(inline_script(js))
    }

    pub fn head(mut self, nodes: impl IntoIterator<Item = HtmlNode>) -> Self {
        self.head.children.extend(nodes);
        self
    }

    pub fn body(mut self, nodes: impl IntoIterator<Item = HtmlNode>) -> Self {
        self.body.children.extend(nodes);
        self
    }

    fn head_node(mut self, node: HtmlNode) -> Self {
        self.head.children.push(node);
        self
    }

    fn body_node(mut self, node: HtmlNode) -> Self {
        self.body.children.push(node);
        self
    }

    /// Indented document with a doctype line, CRLF line ends.
    pub fn format(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>\r\n<html>\r\n");
        self.head.format_into(&mut out, 0);
        self.body.format_into(&mut out, 0);
        out.push_str("</html>");
        out
    }
}

impl fmt::Display for HtmlBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<!DOCTYPE html><html>{}{}</html>", self.head, self.body)
    }
}

pub fn text(text: &str) -> HtmlNode {
    HtmlNode::text_node(text)
}

pub fn node(tag: &str, children: impl IntoIterator<Item = HtmlNode>) -> HtmlNode {
    HtmlNode::new(tag).with_children(children)
}

pub fn title(text: &str) -> HtmlNode {
    HtmlNode::new("title").text(text)
}

pub fn meta(name: &str, value: &str) -> HtmlNode {
    HtmlNode::void("meta").attr(name, value)
}

pub fn style_sheet(css: &str) -> HtmlNode {
    HtmlNode::new("style").kind("text/css").text(css)
}

pub fn link_css(href: &str) -> HtmlNode {
    HtmlNode::void("link").href(href).stylesheet()
}

pub fn script(url: &str) -> HtmlNode {
    HtmlNode::new("script").src(url)
}

pub fn inline_script(js: &str) -> HtmlNode {
    HtmlNode::new("script").text(js)
}

pub fn div(children: impl IntoIterator<Item = HtmlNode>) -> HtmlNode {
    node("div", children)
}

pub fn ul(children: impl IntoIterator<Item = HtmlNode>) -> HtmlNode {
    node("ul", children)
}

pub fn ol(children: impl IntoIterator<Item = HtmlNode>) -> HtmlNode {
    node("ol", children)
}

pub fn li(children: impl IntoIterator<Item = HtmlNode>) -> HtmlNode {
    node("li", children)
}

pub fn li_text(text: &str) -> HtmlNode {
    HtmlNode::new("li").text(text)
}

pub fn table(children: impl IntoIterator<Item = HtmlNode>) -> HtmlNode {
    node("table", children)
}

pub fn thead(children: impl IntoIterator<Item = HtmlNode>) -> HtmlNode {
    node("thead", children)
}

pub fn tbody(children: impl IntoIterator<Item = HtmlNode>) -> HtmlNode {
    node("tbody", children)
}

pub fn tr(children: impl IntoIterator<Item = HtmlNode>) -> HtmlNode {
    node("tr", children)
}

pub fn td(text: &str) -> HtmlNode {
    HtmlNode::new("td").text(text)
}

pub fn th(text: &str) -> HtmlNode {
    HtmlNode::new("th").text(text)
}

/// Heading of the given level, clamped to `h1..=h6`.
pub fn heading(level: u8, text: &str) -> HtmlNode {
    HtmlNode::new(&format!("h{}", level.clamp(1, 6))).text(text)
}

pub fn h1(text: &str) -> HtmlNode {
    heading(1, text)
}

pub fn h2(text: &str) -> HtmlNode {
    heading(2, text)
}

pub fn h3(text: &str) -> HtmlNode {
    heading(3, text)
}

pub fn h4(text: &str) -> HtmlNode {
    heading(4, text)
}

pub fn h5(text: &str) -> HtmlNode {
    heading(5, text)
}

pub fn h6(text: &str) -> HtmlNode {
    heading(6, text)
}

pub fn p(text: &str) -> HtmlNode {
    HtmlNode::new("p").text(text)
}

pub fn span(text: &str) -> HtmlNode {
    HtmlNode::new("span").text(text)
}

pub fn button(text: &str) -> HtmlNode {
    HtmlNode::new("button").text(text)
}

/// Link; an empty `href` becomes a no-op `javascript:void(0);` target.
pub fn a(text: &str, href: &str) -> HtmlNode {
    let href = if href.is_empty() { "javascript:void(0);" } else { href };
    HtmlNode::new("a").text(text).href(href)
}

pub fn img(src: &str) -> HtmlNode {
    HtmlNode::void("img").src(src)
}

pub fn input(kind: &str) -> HtmlNode {
    HtmlNode::void("input").kind(kind)
}

pub fn input_with_hint(kind: &str, placeholder: &str) -> HtmlNode {
    input(kind).attr("placeholder", placeholder)
}

pub fn hr() -> HtmlNode {
    HtmlNode::new("hr")
}

pub fn br() -> HtmlNode {
    HtmlNode::new("br")
}
