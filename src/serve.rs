//! Development server with live reload support.
//!
//! - Static file serving from the build output directory
//! - Automatic `index.html` resolution for directories
//! - Rebuild on source changes and browser reload over WebSocket (via `watch`)
//! - Graceful shutdown on Ctrl+C
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────┐
//! │   Main Thread   │  │  Source Watcher  │  │  Output Watcher  │  │ Reload Server│
//! │  (HTTP Server)  │  │  (RebuildGate)   │  │   (ReloadHub)    │  │ (WebSocket)  │
//! └────────┬────────┘  └────────┬─────────┘  └────────┬─────────┘  └──────┬───────┘
//!          │                    │ build_site()        │ broadcast         │ "reload"
//!          ▼                    ▼                     ▼                   ▼
//!    serve output ◄────── config.build.output ───────►            browser tabs
//! ```

use crate::{
    build::{BuildMode, build_site},
    config::SiteConfig,
    log,
    reload::{ReloadHub, start_reload_server},
    watch::{RebuildGate, spawn_output_watcher, spawn_source_watcher},
};
use anyhow::{Context, Result, anyhow};
use std::{
    fs,
    io::Cursor,
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

// ============================================================================
// Server Entry Point
// ============================================================================

/// Build the site, then serve it until Ctrl+C.
///
/// With `[serve] watch`, source changes trigger rebuilds and open pages
/// reload when the output changes. A failed build is logged; the server keeps
/// running and serves whatever output exists.
pub fn serve_site(config: Arc<SiteConfig>) -> Result<()> {
    let serve = &config.serve;
    let interface: IpAddr = serve
        .interface
        .parse()
        .with_context(|| format!("Invalid interface `{}`", serve.interface))?;

    let mode = if serve.watch {
        BuildMode::Dev {
            reload_port: serve.reload_port,
        }
    } else {
        BuildMode::Generate
    };

    let gate = Arc::new(RebuildGate::new());
    gate.run(|| {
        build_site(&config, mode)?;
        Ok(())
    });

    if serve.watch {
        let hub = Arc::new(ReloadHub::new());
        let addr = start_reload_server(SocketAddr::new(interface, serve.reload_port), Arc::clone(&hub))?;
        log!("reload"; "ws://{}", addr);

        // Later builds never wipe the output: the output watcher would lose its directory.
        let mut rebuild_config = (*config).clone();
        rebuild_config.build.clean = false;

        spawn_output_watcher(Arc::clone(&config), hub);
        spawn_source_watcher(Arc::new(rebuild_config), Arc::clone(&gate), mode);
    }

    let (server, addr) = try_bind_port(interface, serve.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://{}", addr);

    // Handle requests in main thread (blocks until Ctrl+C)
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &config.build.output) {
            log!("serve"; "request error: {e}");
        }
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                let bound = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, bound));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Request Handling
// ============================================================================

/// Map a request URL onto a file under `root`.
///
/// Decodes `%xx`, drops the query string and resolves directories to their
/// `index.html`. Paths escaping `root` resolve to nothing.
fn resolve_request(root: &Path, url: &str) -> Option<PathBuf> {
    let url_path = urlencoding::decode(url).map(std::borrow::Cow::into_owned).ok()?;
    let path_without_query = url_path.split(['?', '#']).next().unwrap_or_default();
    let request_path = Path::new(path_without_query.trim_matches('/'));

    if request_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let local_path = root.join(request_path);
    if local_path.is_file() {
        return Some(local_path);
    }
    let index_path = local_path.join("index.html");
    index_path.is_file().then_some(index_path)
}

fn handle_request(request: Request, root: &Path) -> Result<()> {
    match resolve_request(root, request.url()) {
        Some(path) => serve_file(request, &path),
        None => serve_not_found(request),
    }
}

// ============================================================================
// Response Helpers
// ============================================================================

fn content_type(value: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", value).map_err(|()| anyhow!("Invalid header value `{value}`"))
}

/// Serve a file with appropriate content type.
fn serve_file(request: Request, path: &Path) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let response = Response::from_data(content).with_header(content_type(guess_content_type(path))?);

    request.respond(response)?;
    Ok(())
}

/// Serve 404 Not Found response.
fn serve_not_found(request: Request) -> Result<()> {
    let body = "404 Not Found";
    let response = Response::new(
        StatusCode(404),
        vec![content_type("text/plain")?],
        Cursor::new(body),
        Some(body.len()),
        None,
    );
    request.respond(response)?;
    Ok(())
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",

        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",

        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        _ => "application/octet-stream",
    }
}
