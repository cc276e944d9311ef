//! HTTP response handlers.

use crate::utils::mime::{self, types};
use anyhow::{Context, Result};
use std::{fs, path::Path};
use tiny_http::{Header, Method, Request, Response, StatusCode};

/// Respond with a file from disk.
pub fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    let body = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    send_body(request, 200, content_type, body)
}

/// Respond with content rewritten in memory.
pub fn respond_content(request: Request, content_type: &'static str, body: Vec<u8>) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }
    send_body(request, 200, content_type, body)
}

pub fn respond_not_found(request: Request) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 404, types::PLAIN);
    }
    send_body(request, 404, types::PLAIN, b"404 Not Found".to_vec())
}

/// Respond with a transform error (500).
pub fn respond_error(request: Request, error: &anyhow::Error) -> Result<()> {
    let body = format!("500 Internal Server Error\n\n{error:#}");
    send_body(request, 500, types::PLAIN, body.into_bytes())
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response = Response::empty(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let mut response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    // sources change under the dev server, fonts are content-hashed
    if mime::is_text(content_type) {
        response = response.with_header(make_header("Cache-Control", "no-cache"));
    }
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).unwrap()
}
