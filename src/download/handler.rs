//! Download request handling
//!
//! Answers HEAD and GET for one resource kind. Every check (token, lookup,
//! directory, range, seek) runs before a response head exists, so a header
//! is never contradicted by a later failure.

use hyper::{Method, Response};
use std::io::SeekFrom;
use std::sync::Arc;
use tokio::io::AsyncSeekExt;

use super::{
    BufferPolicy, DownloadError, OpenResource, ResourceBody, ResourceKind, ResourceProvider,
};
use crate::http::{self, response, ResponseBody};
use crate::token::{DownloadClaims, TokenValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMethod {
    Head,
    Get,
}

impl DownloadMethod {
    pub fn from_http(method: &Method) -> Option<Self> {
        match *method {
            Method::HEAD => Some(Self::Head),
            Method::GET => Some(Self::Get),
            _ => None,
        }
    }
}

/// One download request, as extracted from the HTTP layer
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub method: DownloadMethod,
    /// Raw `token` query parameter, empty if absent
    pub token: String,
    /// Raw `Range` header value
    pub range: Option<String>,
}

impl DownloadRequest {
    pub fn head(token: impl Into<String>) -> Self {
        Self {
            method: DownloadMethod::Head,
            token: token.into(),
            range: None,
        }
    }

    pub fn get(token: impl Into<String>, range: Option<&str>) -> Self {
        Self {
            method: DownloadMethod::Get,
            token: token.into(),
            range: range.map(ToString::to_string),
        }
    }
}

/// HEAD/GET handler for the resources of one provider
pub struct DownloadHandler<P> {
    provider: P,
    tokens: Arc<dyn TokenValidator>,
    buffers: BufferPolicy,
}

impl<P: ResourceProvider> DownloadHandler<P> {
    /// Create a handler using the built-in buffer table for the provider's kind
    pub fn new(provider: P, tokens: Arc<dyn TokenValidator>) -> Self {
        let buffers = BufferPolicy::for_kind(provider.kind());
        Self {
            provider,
            tokens,
            buffers,
        }
    }

    #[must_use]
    pub fn with_buffer_policy(mut self, buffers: BufferPolicy) -> Self {
        self.buffers = buffers;
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.provider.kind()
    }

    pub const fn buffer_policy(&self) -> &BufferPolicy {
        &self.buffers
    }

    pub async fn handle(&self, request: &DownloadRequest) -> Response<ResponseBody> {
        match request.method {
            DownloadMethod::Head => self.head(request).await,
            DownloadMethod::Get => self.get(request).await,
        }
    }

    /// Describe a resource without consuming the token
    pub async fn head(&self, request: &DownloadRequest) -> Response<ResponseBody> {
        match self.try_head(request).await {
            Ok(response) => response,
            Err(err) => self.reject(err, request.method),
        }
    }

    /// Stream a resource, consuming the token
    pub async fn get(&self, request: &DownloadRequest) -> Response<ResponseBody> {
        match self.try_get(request).await {
            Ok(response) => response,
            Err(err) => self.reject(err, request.method),
        }
    }

    async fn try_head(&self, request: &DownloadRequest) -> Result<Response<ResponseBody>, DownloadError> {
        let claims = self.tokens.parse(self.kind(), &request.token)?;
        let resource = self.open(&claims).await?;
        Ok(response::build_head_response(&resource.metadata))
    }

    async fn try_get(&self, request: &DownloadRequest) -> Result<Response<ResponseBody>, DownloadError> {
        let claims = self.tokens.parse(self.kind(), &request.token)?;
        if !self.tokens.consume(&claims) {
            tracing::debug!(
                kind = %self.kind(),
                server = %claims.server_uuid,
                "download token already used"
            );
            return Err(DownloadError::NotFound);
        }

        let OpenResource {
            mut reader,
            metadata,
        } = self.open(&claims).await?;

        let total = metadata.size;
        let range = http::parse_range_header(request.range.as_deref(), total)
            .map_err(|source| DownloadError::Range { source, total })?;
        let label = format!("{} {}", self.kind(), metadata.name);

        let Some(range) = range else {
            let buffer = self.buffers.buffer_size_for(total);
            tracing::debug!(resource = %label, size = total, buffer, "streaming full resource");
            let body = ResourceBody::new(reader, total, buffer, label);
            return Ok(response::build_full_response(&metadata, body));
        };

        reader.seek(SeekFrom::Start(range.start)).await?;

        let buffer = self.buffers.buffer_size_for(range.size);
        tracing::debug!(
            resource = %label,
            start = range.start,
            end = range.end,
            total,
            buffer,
            "streaming partial resource"
        );
        let body = ResourceBody::new(reader, range.size, buffer, label);
        Ok(response::build_partial_response(&metadata, &range, body))
    }

    /// Open the resource named by the claims; directories count as missing
    async fn open(&self, claims: &DownloadClaims) -> Result<OpenResource, DownloadError> {
        let resource = self.provider.open(claims).await?;
        if resource.metadata.is_directory {
            tracing::debug!(
                kind = %self.kind(),
                server = %claims.server_uuid,
                "download target is a directory"
            );
            return Err(DownloadError::NotFound);
        }
        Ok(resource)
    }

    fn reject(&self, err: DownloadError, method: DownloadMethod) -> Response<ResponseBody> {
        match &err {
            DownloadError::Storage(e) => tracing::error!(
                kind = %self.kind(),
                ?method,
                error = %e,
                "failed to open download resource"
            ),
            other => tracing::debug!(
                kind = %self.kind(),
                ?method,
                status = other.status_code().as_u16(),
                reason = %other,
                "download rejected"
            ),
        }
        err.into_response()
    }
}
