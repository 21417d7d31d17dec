//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: route matching, method
//! validation, extraction of the token and `Range` header, and access logging.

use hyper::http::request::Parts;
use hyper::{header, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppState;
use crate::download::{DownloadMethod, DownloadRequest};
use crate::http::{self, ResponseBody};
use crate::logger::{self, AccessLogEntry};

pub const BACKUP_DOWNLOAD_PATH: &str = "/download/backup";
pub const FILE_DOWNLOAD_PATH: &str = "/download/file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Backup,
    File,
}

impl Route {
    fn from_path(path: &str) -> Option<Self> {
        match path {
            BACKUP_DOWNLOAD_PATH => Some(Self::Backup),
            FILE_DOWNLOAD_PATH => Some(Self::File),
            _ => None,
        }
    }
}

/// Main entry point for HTTP request handling
///
/// The request body is never read; downloads are driven by the query and
/// headers alone.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    let started = Instant::now();
    let (parts, _body) = req.into_parts();

    let response = route_request(&parts, &state).await;

    if state.access_log() {
        let entry = access_entry(&parts, &response, peer, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }
    Ok(response)
}

async fn route_request(parts: &Parts, state: &AppState) -> Response<ResponseBody> {
    let Some(route) = Route::from_path(parts.uri.path()) else {
        tracing::debug!(path = parts.uri.path(), "no route");
        return http::build_404_response();
    };
    let Some(method) = DownloadMethod::from_http(&parts.method) else {
        tracing::debug!(method = %parts.method, "method not allowed");
        return http::build_405_response();
    };

    let request = DownloadRequest {
        method,
        token: token_from_query(parts.uri.query()),
        range: header_value(parts, header::RANGE),
    };

    match route {
        Route::Backup => state.backups.handle(&request).await,
        Route::File => state.files.handle(&request).await,
    }
}

/// Value of the `token` query parameter, empty if absent
///
/// Tokens are URL-safe base64 JWTs, so no percent-decoding is needed.
fn token_from_query(query: Option<&str>) -> String {
    query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .find_map(|pair| pair.strip_prefix("token="))
        .unwrap_or_default()
        .to_string()
}

fn header_value(parts: &Parts, name: header::HeaderName) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

fn access_entry(
    parts: &Parts,
    response: &Response<ResponseBody>,
    peer: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.http_version = version_label(parts.version).to_string();
    entry.status = response.status().as_u16();
    entry.content_length = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    entry.range = header_value(parts, header::RANGE);
    entry.user_agent = header_value(parts, header::USER_AGENT);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}
