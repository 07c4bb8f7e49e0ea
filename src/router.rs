use crate::context::RouterContext;
use crate::error::ServerResult;
use crate::http::strip_query;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Named segment bindings produced by a successful match
pub type PathParams = HashMap<String, String>;

/// A handler function for processing HTTP requests.
///
/// The handler owns finalizing `ctx.response`; the server never finalizes on
/// its behalf. Returning an error only gets it logged.
pub type HandlerFn = Arc<dyn Fn(&mut RouterContext) -> ServerResult<()> + Send + Sync>;

/// Outcome of matching a path against a route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch {
    NoMatch,
    Match(PathParams),
}

impl PathMatch {
    pub fn is_match(&self) -> bool {
        matches!(self, PathMatch::Match(_))
    }
}

/// Match `path` against a `/`-segmented `pattern`.
///
/// A `:name` segment binds one non-empty path segment. Segment counts must be
/// equal; there are no wildcards. Reaching a `:` segment that is the last one
/// in the pattern ends the walk with a match.
pub fn match_path(pattern: &str, path: &str) -> PathMatch {
    if pattern == path {
        return PathMatch::Match(PathParams::new());
    }

    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    let path_segments: Vec<&str> = path.split('/').collect();

    if pattern_segments.len() != path_segments.len() {
        return PathMatch::NoMatch;
    }

    let last = pattern_segments.len() - 1;
    let mut params = PathParams::new();

    for (i, (pattern_seg, path_seg)) in pattern_segments.iter().zip(&path_segments).enumerate() {
        if let Some(name) = pattern_seg.strip_prefix(':') {
            if path_seg.is_empty() {
                return PathMatch::NoMatch;
            }
            params.insert(name.to_string(), path_seg.to_string());
            if i == last {
                return PathMatch::Match(params);
            }
            continue;
        }

        if pattern_seg != path_seg {
            return PathMatch::NoMatch;
        }
    }

    // Walked every segment. Only a parametrized pattern can get here as a match;
    // a literal pattern equal segment-by-segment was already caught above.
    if params.is_empty() {
        PathMatch::NoMatch
    } else {
        PathMatch::Match(params)
    }
}

/// A registered path pattern and its handler
#[derive(Clone)]
pub struct Route {
    pattern: String,
    handler: HandlerFn,
}

// Custom Debug implementation for Route since handler can't be automatically derived
impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("handler", &"<function>")
            .finish()
    }
}

impl Route {
    pub fn new<F>(pattern: &str, handler: F) -> Self
    where
        F: Fn(&mut RouterContext) -> ServerResult<()> + Send + Sync + 'static,
    {
        Self::from_handler(pattern, Arc::new(handler))
    }

    pub fn from_handler(pattern: &str, handler: HandlerFn) -> Self {
        Self {
            pattern: pattern.to_string(),
            handler,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> &HandlerFn {
        &self.handler
    }

    /// Check if a path (without query) matches this route's pattern
    pub fn matches(&self, path: &str) -> bool {
        match_path(&self.pattern, path).is_match()
    }

    /// Extract path parameters, empty when the path does not match
    pub fn path_params(&self, path: &str) -> PathParams {
        match match_path(&self.pattern, path) {
            PathMatch::Match(params) => params,
            PathMatch::NoMatch => PathParams::new(),
        }
    }

    pub fn handle(&self, ctx: &mut RouterContext) -> ServerResult<()> {
        (self.handler)(ctx)
    }
}

/// Ordered routing table.
///
/// Resolution scans routes in registration order and the first match wins,
/// so a request costs O(number of routes). A pattern registered twice leaves
/// the second entry unreachable.
#[derive(Clone, Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route to the router
    pub fn add_route<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RouterContext) -> ServerResult<()> + Send + Sync + 'static,
    {
        self.add(Route::new(pattern, handler))
    }

    pub fn add(&mut self, route: Route) -> &mut Self {
        self.routes.push(route);
        self
    }

    /// Find the first route matching `target`, ignoring any `?query` suffix
    pub fn resolve(&self, target: &str) -> Option<(&Route, PathParams)> {
        let path = strip_query(target);
        self.routes
            .iter()
            .find_map(|route| match match_path(&route.pattern, path) {
                PathMatch::Match(params) => Some((route, params)),
                PathMatch::NoMatch => None,
            })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
