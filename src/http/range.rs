//! HTTP Range request parsing module
//!
//! Range header parsing for resumable downloads, following RFC 7233 for the
//! single-range `bytes` unit.

use thiserror::Error;

/// Resolved byte range, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    /// First byte offset
    pub start: u64,
    /// Last byte offset (inclusive)
    pub end: u64,
    /// Number of bytes covered, `end - start + 1`
    pub size: u64,
}

impl RangeSpec {
    /// `Content-Range` value for a partial response
    pub fn content_range(&self, total_size: u64) -> String {
        format!("bytes {}-{}/{total_size}", self.start, self.end)
    }
}

/// Range header parse failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Header is not a well-formed `bytes=` range
    #[error("invalid range format: {0}")]
    InvalidFormat(&'static str),
    /// Range is well-formed but falls outside the resource
    #[error("range not satisfiable")]
    Unsatisfiable,
}

/// Range form before it is resolved against a resource size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeForm {
    /// `-N`: last N bytes
    Suffix(u64),
    /// `N-`: from N to the end
    From(u64),
    /// `N-M`
    Closed(u64, u64),
}

/// Parse HTTP Range header (first range only, bytes unit)
///
/// Supported formats:
/// - `bytes=start-end` - Specific range
/// - `bytes=start-` - From start to end
/// - `bytes=-suffix` - Last suffix bytes
///
/// When several comma-separated ranges are sent only the first one is
/// honoured and the rest are dropped; multipart responses are not produced.
///
/// # Returns
/// `Ok(None)` when no range was requested, `Ok(Some(_))` for a satisfiable
/// range, `Err(_)` for anything that must be answered with 416.
///
/// # Examples
/// ```
/// use node_downloads::http::range::{parse_range_header, RangeError};
///
/// let range = parse_range_header(Some("bytes=0-99"), 1000).unwrap().unwrap();
/// assert_eq!((range.start, range.end, range.size), (0, 99, 100));
///
/// assert_eq!(parse_range_header(None, 1000), Ok(None));
/// assert_eq!(
///     parse_range_header(Some("bytes=1000-"), 1000),
///     Err(RangeError::Unsatisfiable)
/// );
/// ```
pub fn parse_range_header(
    range_header: Option<&str>,
    total_size: u64,
) -> Result<Option<RangeSpec>, RangeError> {
    let Some(header) = range_header.map(str::trim) else {
        return Ok(None);
    };
    if header.is_empty() {
        return Ok(None);
    }

    let Some(ranges) = header.strip_prefix("bytes=") else {
        return Err(RangeError::InvalidFormat("missing bytes= unit"));
    };

    let first = ranges.split(',').next().unwrap_or_default().trim();
    let form = parse_form(first)?;
    resolve(form, total_size).map(Some)
}

fn parse_form(spec: &str) -> Result<RangeForm, RangeError> {
    if let Some(suffix) = spec.strip_prefix('-') {
        return parse_offset(suffix, "invalid suffix length").map(RangeForm::Suffix);
    }

    if let Some(start) = spec.strip_suffix('-') {
        return parse_offset(start, "invalid range start").map(RangeForm::From);
    }

    let mut parts = spec.split('-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(start), Some(end), None) => Ok(RangeForm::Closed(
            parse_offset(start, "invalid range start")?,
            parse_offset(end, "invalid range end")?,
        )),
        _ => Err(RangeError::InvalidFormat("expected start-end")),
    }
}

fn parse_offset(value: &str, reason: &'static str) -> Result<u64, RangeError> {
    value
        .parse::<u64>()
        .map_err(|_| RangeError::InvalidFormat(reason))
}

fn resolve(form: RangeForm, total_size: u64) -> Result<RangeSpec, RangeError> {
    // Empty resources cannot satisfy any concrete range
    let Some(last) = total_size.checked_sub(1) else {
        return Err(RangeError::Unsatisfiable);
    };

    let (start, end) = match form {
        RangeForm::Suffix(len) => {
            if len == 0 {
                return Err(RangeError::Unsatisfiable);
            }
            (total_size.saturating_sub(len), last)
        }
        RangeForm::From(start) => (start, last),
        RangeForm::Closed(start, end) => (start, end),
    };

    if start > last || end < start || end > last {
        return Err(RangeError::Unsatisfiable);
    }

    Ok(RangeSpec {
        start,
        end,
        size: end - start + 1,
    })
}
