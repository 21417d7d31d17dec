//! HTTP protocol layer module
//!
//! Range parsing and response builders, kept free of storage and token logic.

pub mod range;
pub mod response;

// Re-export commonly used types
pub use range::{parse_range_header, RangeError, RangeSpec};
pub use response::{
    build_400_response, build_404_response, build_405_response, build_416_response,
    build_500_response, ResponseBody,
};
