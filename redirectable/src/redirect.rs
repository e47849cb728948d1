//! Pure redirect rules applied between hops.
//!
//! Nothing in here performs I/O. The chain driver calls these in order:
//! [`is_redirect`], then [`resolve_location`], then [`next_method`] and the
//! header rules, and finally [`apply_url`] to point the options at the new
//! target.

mod headers;
mod location;
mod method;

pub use headers::{
    drop_sensitive_headers, remove_body_headers, remove_host_header, SENSITIVE_HEADERS,
};
pub use location::{apply_url, effective_host, format_url, host_of, resolve_location};
pub use method::{is_redirect, next_method, preserves_method};
