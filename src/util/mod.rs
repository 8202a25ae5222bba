//! Shared helpers used across the pipeline.
//!
//! - **URL validation**: SSRF-conscious validation applied to every
//!   configured source URL before it is ever fetched.
//! - **Text sanitization**: control-character stripping applied to feed
//!   text before it lands in a rendered XML element.

mod text;
mod url_validator;

pub use text::strip_control_chars;
pub use url_validator::{validate_url, UrlValidationError};
