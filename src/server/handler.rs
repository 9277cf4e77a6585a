//! `/stream/{token}` handler
//!
//! GET and HEAD share one code path; HEAD just gets no body. The body is
//! produced by a pump task that reads the virtual file piece by piece and
//! pushes each piece into a bounded channel feeding the response. When
//! the client goes away the channel closes and the pump stops.

use crate::error::{Error, Result};
use crate::server::range::{unsatisfied_range, RangeRequest};
use crate::server::AppState;
use crate::stream::VirtualFile;
use crate::token;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, response::Builder, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::channel::mpsc;
use futures::SinkExt;
use std::io::{self, SeekFrom};
use tracing::{debug, error, info, warn};

/// Longest file name shown in log lines
const DISPLAY_NAME_MAX: usize = 40;

type Piece = std::result::Result<Bytes, io::Error>;

/// Serve a remote file with byte range support
pub async fn stream_media(
    State(state): State<AppState>,
    Path(token): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    match serve(state, &token, &method, &headers).await {
        Ok(response) => response,
        Err(e) => error_response(e),
    }
}

/// CORS preflight; never touches the token or Telegram
pub async fn preflight() -> Response {
    with_cors(Response::builder().status(StatusCode::OK))
        .body(Body::empty())
        .unwrap_or_else(|_| StatusCode::OK.into_response())
}

async fn serve(
    state: AppState,
    token: &str,
    method: &Method,
    headers: &HeaderMap,
) -> Result<Response> {
    let message = token::decode(token)?;
    let file = VirtualFile::open(
        message,
        state.resolver.as_ref(),
        &state.pool,
        &state.config,
    )
    .await?;

    let size = file.size();
    let name = file.location().display_name(message);
    let range_header = headers
        .get(header::RANGE)
        .map(|value| value.to_str().unwrap_or_default());

    info!(
        "[STREAM] {} | {}",
        display_name(&name),
        range_header.unwrap_or("full")
    );

    let request = RangeRequest::from_header(range_header, size);
    let (status, start, length, content_range) = match request {
        RangeRequest::Full => (StatusCode::OK, 0, size, None),
        RangeRequest::Partial(range) => (
            StatusCode::PARTIAL_CONTENT,
            range.start,
            range.length(),
            Some(range.content_range(size)),
        ),
        RangeRequest::Unsatisfiable => return unsatisfiable(size),
    };

    let mut builder = with_cors(Response::builder().status(status))
        .header(header::CONTENT_TYPE, file.mime_type())
        .header(header::CONTENT_LENGTH, length)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", header_safe(&name)),
        )
        .header(header::CACHE_CONTROL, "public, max-age=31536000");

    if let Some(content_range) = content_range {
        builder = builder.header(header::CONTENT_RANGE, content_range);
    }

    let body = if *method == Method::HEAD || length == 0 {
        Body::empty()
    } else {
        Body::from_stream(spawn_pump(
            file,
            start,
            length,
            state.config.read_size,
            state.config.body_buffer,
            name,
        ))
    };

    builder.body(body).map_err(|e| Error::Internal(e.to_string()))
}

fn spawn_pump(
    file: VirtualFile,
    start: u64,
    length: u64,
    read_size: usize,
    buffer: usize,
    name: String,
) -> mpsc::Receiver<Piece> {
    let (tx, rx) = mpsc::channel(buffer);
    tokio::spawn(pump(file, start, length, read_size, tx, name));
    rx
}

/// Copy `length` bytes from `start` into the response channel
async fn pump(
    file: VirtualFile,
    start: u64,
    length: u64,
    read_size: usize,
    mut tx: mpsc::Sender<Piece>,
    name: String,
) {
    if let Err(e) = file.seek(SeekFrom::Start(start)) {
        error!("[STREAM] Cannot seek {} to {}: {}", name, start, e);
        let _ = tx.send(Err(io::Error::new(io::ErrorKind::Other, e.to_string()))).await;
        return;
    }

    let mut remaining = length;
    let mut buf = vec![0u8; read_size.max(1)];

    while remaining > 0 {
        if tx.is_closed() {
            debug!("[STREAM] Client left {} with {} bytes unsent", name, remaining);
            return;
        }

        let want = remaining.min(buf.len() as u64) as usize;
        match file.read(&mut buf[..want]).await {
            Ok(0) => {
                warn!("[STREAM] {} ended {} bytes early", name, remaining);
                return;
            }
            Ok(n) => {
                if tx.send(Ok(Bytes::copy_from_slice(&buf[..n]))).await.is_err() {
                    debug!("[STREAM] Client left {} with {} bytes unsent", name, remaining);
                    return;
                }
                remaining -= n as u64;
            }
            Err(e) => {
                error!("[STREAM] Error streaming {}: {}", name, e);
                let _ = tx.send(Err(io::Error::new(io::ErrorKind::Other, e.to_string()))).await;
                return;
            }
        }
    }

    debug!("[STREAM] Finished {} ({} bytes)", name, length);
}

fn unsatisfiable(size: u64) -> Result<Response> {
    with_cors(Response::builder().status(StatusCode::RANGE_NOT_SATISFIABLE))
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_RANGE, unsatisfied_range(size))
        .body(Body::empty())
        .map_err(|e| Error::Internal(e.to_string()))
}

fn error_response(err: Error) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!("[STREAM] {}", err);
    } else {
        warn!("[STREAM] {}", err);
    }

    with_cors(Response::builder().status(status))
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(err.public_message()))
        .unwrap_or_else(|_| status.into_response())
}

fn with_cors(builder: Builder) -> Builder {
    builder
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "GET, HEAD, OPTIONS")
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, "Range")
        .header(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            "Content-Length, Content-Range",
        )
}

/// File name shortened for log lines
fn display_name(name: &str) -> String {
    if name.chars().count() > DISPLAY_NAME_MAX {
        let head: String = name.chars().take(DISPLAY_NAME_MAX - 3).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

/// Strip characters that cannot appear inside a quoted header value
fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' => '\'',
            '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_truncation() {
        assert_eq!(display_name("short.mkv"), "short.mkv");

        let long = "a".repeat(50);
        let shown = display_name(&long);
        assert_eq!(shown.chars().count(), 40);
        assert!(shown.ends_with("..."));

        let exact = "b".repeat(40);
        assert_eq!(display_name(&exact), exact);
    }

    #[test]
    fn test_display_name_respects_char_boundaries() {
        let name = "é".repeat(45);
        assert_eq!(display_name(&name).chars().count(), 40);
    }

    #[test]
    fn test_header_safe() {
        assert_eq!(header_safe("My \"Movie\".mkv"), "My 'Movie'.mkv");
        assert_eq!(header_safe("a\nb\\c"), "a_b_c");
    }
}
