use crate::context::RouterContext;
use crate::error::ServerResult;
use crate::router::HandlerFn;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Get the content type for a file based on its extension
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        // Text types
        "htm" | "html" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "txt" => "text/plain",
        "csv" => "text/csv",

        // Application types
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",

        // Image types
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",

        _ => "application/octet-stream",
    }
}

/// Map a request path below `prefix` onto a file under `root`.
///
/// Returns `None` when the path does not contain `prefix`. Empty, `.` and `..`
/// segments are dropped so the result never escapes `root`.
fn resolve_file(root: &Path, prefix: &str, path: &str) -> Option<PathBuf> {
    let relative = if prefix.is_empty() {
        path
    } else {
        let start = path.find(prefix)?;
        &path[start + prefix.len()..]
    };

    let mut fs_path = root.to_path_buf();
    for segment in relative.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        fs_path.push(segment);
    }
    Some(fs_path)
}

/// A handler serving files under `root` for request paths below `prefix`.
///
/// Directories serve their `index.html`. Missing files get the stock 404
/// page and read errors a 500 carrying the error text. Meant to be used as
/// the default handler or on a fixed route.
pub fn static_file_handler<P: Into<PathBuf>>(root: P, prefix: &str) -> HandlerFn {
    let root = root.into();
    let prefix = prefix.to_string();
    Arc::new(move |ctx: &mut RouterContext| serve_file(ctx, &root, &prefix))
}

fn serve_file(ctx: &mut RouterContext, root: &Path, prefix: &str) -> ServerResult<()> {
    let path = ctx.request.path().to_string();

    let Some(mut fs_path) = resolve_file(root, prefix, &path) else {
        log::debug!("{} is outside {}", path, prefix);
        return ctx.response.not_found().finalize_text();
    };

    if fs_path.is_dir() {
        fs_path.push("index.html");
    }
    if !fs_path.is_file() {
        log::debug!("no file for {}", path);
        return ctx.response.not_found().finalize_text();
    }

    match fs::read(&fs_path) {
        Ok(contents) => {
            let mut content_type = content_type_for(&fs_path).to_string();
            if content_type.starts_with("text/") {
                content_type.push_str(";charset=utf-8");
            }
            log::debug!("serving {} as {}", fs_path.display(), content_type);

            ctx.response
                .ok()
                .set_content_type(&content_type)
                .add_bytes(&contents)
                .finalize_binary()
        }
        Err(e) => ctx
            .response
            .internal_error_with(&e.to_string())
            .finalize_text(),
    }
}
