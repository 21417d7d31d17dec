//! HTTP response building module
//!
//! Builders for every status the download endpoints can answer with. Error
//! responses carry a small JSON body; download responses carry the resource
//! headers and, for GET, a streaming body.

use chrono::{DateTime, Utc};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::http::response::Builder;
use hyper::{header, Response, StatusCode};
use std::io;

use super::range::RangeSpec;
use crate::download::{ResourceBody, ResourceMetadata};

/// Body type shared by every response the server produces
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

pub const NOT_FOUND_MESSAGE: &str = "The requested resource was not found on this server.";
pub const INVALID_TOKEN_MESSAGE: &str = "The download token provided is not valid.";
pub const INTERNAL_ERROR_MESSAGE: &str =
    "An unexpected error was encountered while processing this request.";

/// Empty body
pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// In-memory body
pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Build a JSON `{"error": ...}` response
pub fn json_error(status: StatusCode, message: &str) -> Response<ResponseBody> {
    let body = serde_json::json!({ "error": message }).to_string();
    finish(
        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json"),
        full(body),
    )
}

/// Build 400 Bad Request response for an unusable token
pub fn build_400_response() -> Response<ResponseBody> {
    json_error(StatusCode::BAD_REQUEST, INVALID_TOKEN_MESSAGE)
}

/// Build 404 Not Found response
///
/// Used for every lookup failure so callers cannot tell a missing resource
/// from a replayed token or a directory.
pub fn build_404_response() -> Response<ResponseBody> {
    json_error(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ResponseBody> {
    finish(
        Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header(header::ALLOW, "GET, HEAD")
            .header(header::CONTENT_TYPE, "application/json"),
        full(serde_json::json!({ "error": "Method Not Allowed" }).to_string()),
    )
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(total_size: u64) -> Response<ResponseBody> {
    finish(
        Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{total_size}")),
        empty(),
    )
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<ResponseBody> {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
}

/// Build the HEAD answer for a resource: headers only
pub fn build_head_response(meta: &ResourceMetadata) -> Response<ResponseBody> {
    let mut builder = download_headers(Response::builder().status(StatusCode::OK), meta)
        .header(header::CONTENT_LENGTH, meta.size);
    if let Some(modified) = meta.last_modified {
        builder = builder.header(header::LAST_MODIFIED, http_date(modified));
    }
    finish(builder, empty())
}

/// Build 200 OK response streaming the whole resource
pub fn build_full_response(meta: &ResourceMetadata, body: ResourceBody) -> Response<ResponseBody> {
    finish(
        download_headers(Response::builder().status(StatusCode::OK), meta)
            .header(header::CONTENT_LENGTH, meta.size),
        body.boxed_unsync(),
    )
}

/// Build 206 Partial Content response streaming one range
pub fn build_partial_response(
    meta: &ResourceMetadata,
    range: &RangeSpec,
    body: ResourceBody,
) -> Response<ResponseBody> {
    finish(
        download_headers(Response::builder().status(StatusCode::PARTIAL_CONTENT), meta)
            .header(header::CONTENT_RANGE, range.content_range(meta.size))
            .header(header::CONTENT_LENGTH, range.size),
        body.boxed_unsync(),
    )
}

/// Format a timestamp as an RFC 7231 IMF-fixdate
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// `Content-Disposition` value with the file name quoted and escaped
pub fn attachment_disposition(name: &str) -> String {
    format!("attachment; filename={name:?}")
}

fn download_headers(builder: Builder, meta: &ResourceMetadata) -> Builder {
    builder
        .header(header::CONTENT_DISPOSITION, attachment_disposition(&meta.name))
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::ACCEPT_RANGES, "bytes")
}

fn finish(builder: Builder, body: ResponseBody) -> Response<ResponseBody> {
    builder.body(body).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to build response");
        let mut response = Response::new(empty());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta() -> ResourceMetadata {
        ResourceMetadata {
            name: "world \"1\".zip".to_string(),
            size: 1000,
            last_modified: Some(Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap()),
            is_directory: false,
        }
    }

    async fn body_string(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_http_date() {
        let time = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(http_date(time), "Tue, 05 Mar 2024 07:08:09 GMT");
    }

    #[test]
    fn test_disposition_escapes_quotes() {
        assert_eq!(
            attachment_disposition("world \"1\".zip"),
            r#"attachment; filename="world \"1\".zip""#
        );
        assert_eq!(
            attachment_disposition("server.properties"),
            "attachment; filename=\"server.properties\""
        );
    }

    #[tokio::test]
    async fn test_head_response_headers() {
        let response = build_head_response(&meta());
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_LENGTH], "1000");
        assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
        assert_eq!(headers[header::LAST_MODIFIED], "Tue, 05 Mar 2024 07:08:09 GMT");
        assert!(body_string(response).await.is_empty());
    }

    #[test]
    fn test_head_response_without_modified_time() {
        let mut meta = meta();
        meta.last_modified = None;
        let response = build_head_response(&meta);
        assert!(response.headers().get(header::LAST_MODIFIED).is_none());
    }

    #[tokio::test]
    async fn test_416_response() {
        let response = build_416_response(1000);
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */1000");
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_404_is_json() {
        let response = build_404_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["error"], NOT_FOUND_MESSAGE);
    }

    #[test]
    fn test_405_lists_allowed_methods() {
        let response = build_405_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD");
    }
}
