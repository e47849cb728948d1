//! Redirect and body size limits.
//!
//! The defaults match the long-standing follow-redirects values: 21 hops and
//! a 10 MiB buffered request body.

use crate::error::RedirectError;

/// Default values for [`RedirectConfig`].
pub mod defaults {
    /// Maximum number of redirects followed per request.
    pub const MAX_REDIRECTS: usize = 21;
    /// Maximum cumulative request body size in bytes (10 MiB).
    pub const MAX_BODY_LENGTH: usize = 10 * 1024 * 1024;
}

/// Wrapper-level defaults applied to requests that do not set their own.
///
/// # Example
///
/// ```rust
/// use redirectable::RedirectConfig;
///
/// let config = RedirectConfig::default();
/// assert_eq!(config.max_redirects(), 21);
///
/// let strict = RedirectConfig::new().with_max_redirects(3).with_max_body_length(1024);
/// assert_eq!(strict.max_body_length(), 1024);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RedirectConfig {
    max_redirects: usize,
    max_body_length: usize,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            max_redirects: defaults::MAX_REDIRECTS,
            max_body_length: defaults::MAX_BODY_LENGTH,
        }
    }
}

impl RedirectConfig {
    /// Create a config with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of redirects.
    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Set the maximum cumulative body length.
    pub fn with_max_body_length(mut self, max: usize) -> Self {
        self.max_body_length = max;
        self
    }

    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    pub fn max_body_length(&self) -> usize {
        self.max_body_length
    }
}

/// Running total of request body bytes written to a chain.
///
/// Every write is counted, including writes that are discarded because the
/// method was downgraded to GET.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyLimit {
    limit: usize,
    written: usize,
}

impl BodyLimit {
    /// Create a tracker allowing at most `limit` bytes.
    pub fn new(limit: usize) -> Self {
        Self { limit, written: 0 }
    }

    /// The configured limit in bytes.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes accepted so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Account for `len` more bytes.
    ///
    /// Writing exactly up to the limit is allowed; one byte over fails and
    /// leaves the running total unchanged.
    pub fn check_size(&mut self, len: usize) -> Result<(), RedirectError> {
        let total = self.written.saturating_add(len);
        if total > self.limit {
            return Err(RedirectError::BodyTooLarge { limit: self.limit });
        }
        self.written = total;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RedirectConfig::default();
        assert_eq!(config.max_redirects(), defaults::MAX_REDIRECTS);
        assert_eq!(config.max_body_length(), defaults::MAX_BODY_LENGTH);
        assert_eq!(config.max_body_length(), 10_485_760);
    }

    #[test]
    fn test_custom_config() {
        let config = RedirectConfig::new()
            .with_max_redirects(0)
            .with_max_body_length(8);
        assert_eq!(config.max_redirects(), 0);
        assert_eq!(config.max_body_length(), 8);
    }

    #[test]
    fn test_check_size_within_limit() {
        let mut limit = BodyLimit::new(1024);
        assert!(limit.check_size(512).is_ok());
        assert!(limit.check_size(512).is_ok());
        assert_eq!(limit.written(), 1024);
    }

    #[test]
    fn test_check_size_exceeds_limit() {
        let mut limit = BodyLimit::new(1024);
        limit.check_size(1000).unwrap();
        let err = limit.check_size(25).unwrap_err();
        assert!(err.is_body_too_large());
        assert_eq!(limit.written(), 1000);
    }

    #[test]
    fn test_zero_limit_allows_empty_writes() {
        let mut limit = BodyLimit::new(0);
        assert!(limit.check_size(0).is_ok());
        assert!(limit.check_size(1).is_err());
    }
}
