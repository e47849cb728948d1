//! Hooks run between the hops of a redirect chain.
//!
//! A [`BeforeRedirect`] hook sees the options of the next hop after the
//! method, URL and header rules have been applied, and may edit them further
//! or abort the chain. A [`RedirectPredicate`] decides whether a redirect is
//! followed at all; a declined redirect is delivered as the final response.
//!
//! # Example
//!
//! ```ignore
//! use redirectable::{Chain, HeaderHook, RedirectHook, RequestOptions};
//!
//! let hooks = Chain(
//!     HeaderHook::new("x-redirected", "1"),
//!     RedirectHook::new(|options: &mut RequestOptions, response, _request| {
//!         tracing::debug!(status = %response.status, next = %options.url(), "following");
//!         Ok(())
//!     }),
//! );
//! let options = RequestOptions::parse("http://localhost:3000/a")?.before_redirect_hook(hooks);
//! ```

use http::{HeaderName, HeaderValue};

use crate::error::{BoxError, RedirectError};
use crate::options::RequestOptions;
use crate::response::{RequestDescriptor, ResponseHead};

/// Hook invoked before each redirect is dispatched.
///
/// # Generic Composition
///
/// Hooks compose with the [`Chain`] combinator. The unit type `()` is the
/// no-op base case.
pub trait BeforeRedirect: Send + Sync {
    /// Inspect or edit the next hop's options.
    ///
    /// Returning an error aborts the chain with
    /// [`RedirectError::Redirection`] wrapping the returned cause.
    fn before_redirect(
        &self,
        options: &mut RequestOptions,
        response: &ResponseHead,
        request: &RequestDescriptor,
    ) -> Result<(), BoxError>;
}

impl BeforeRedirect for () {
    #[inline]
    fn before_redirect(
        &self,
        _options: &mut RequestOptions,
        _response: &ResponseHead,
        _request: &RequestDescriptor,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Predicate deciding whether a redirect response is followed.
pub trait RedirectPredicate: Send + Sync {
    fn should_redirect(&self, response: &ResponseHead, request: &RequestDescriptor) -> bool;
}

/// Two hooks run in sequence; the first error short-circuits.
#[derive(Clone, Debug)]
pub struct Chain<A, B>(pub A, pub B);

impl<A, B> BeforeRedirect for Chain<A, B>
where
    A: BeforeRedirect,
    B: BeforeRedirect,
{
    #[inline]
    fn before_redirect(
        &self,
        options: &mut RequestOptions,
        response: &ResponseHead,
        request: &RequestDescriptor,
    ) -> Result<(), BoxError> {
        self.0.before_redirect(options, response, request)?;
        self.1.before_redirect(options, response, request)
    }
}

/// Sets a header on every redirected hop.
#[derive(Clone, Debug)]
pub struct HeaderHook {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderHook {
    /// Create a new header hook.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.parse().expect("invalid header name"),
            value: value.parse().expect("invalid header value"),
        }
    }

    /// Try to create a new header hook.
    pub fn try_new(name: &str, value: &str) -> Result<Self, RedirectError> {
        let name = name.parse().map_err(|_| RedirectError::InvalidHeader {
            what: "name",
            input: name.to_string(),
        })?;
        let value = value.parse().map_err(|_| RedirectError::InvalidHeader {
            what: "value",
            input: value.to_string(),
        })?;
        Ok(Self { name, value })
    }

    /// Create a new header hook from pre-parsed values.
    pub fn from_parts(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }
}

impl BeforeRedirect for HeaderHook {
    fn before_redirect(
        &self,
        options: &mut RequestOptions,
        _response: &ResponseHead,
        _request: &RequestDescriptor,
    ) -> Result<(), BoxError> {
        options.headers.insert(self.name.clone(), self.value.clone());
        Ok(())
    }
}

/// Adapts a closure to [`BeforeRedirect`].
pub struct RedirectHook<F> {
    hook: F,
}

impl<F> RedirectHook<F>
where
    F: Fn(&mut RequestOptions, &ResponseHead, &RequestDescriptor) -> Result<(), BoxError>
        + Send
        + Sync,
{
    pub fn new(hook: F) -> Self {
        Self { hook }
    }
}

impl<F: Clone> Clone for RedirectHook<F> {
    fn clone(&self) -> Self {
        Self {
            hook: self.hook.clone(),
        }
    }
}

impl<F> std::fmt::Debug for RedirectHook<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectHook").finish()
    }
}

impl<F> BeforeRedirect for RedirectHook<F>
where
    F: Fn(&mut RequestOptions, &ResponseHead, &RequestDescriptor) -> Result<(), BoxError>
        + Send
        + Sync,
{
    fn before_redirect(
        &self,
        options: &mut RequestOptions,
        response: &ResponseHead,
        request: &RequestDescriptor,
    ) -> Result<(), BoxError> {
        (self.hook)(options, response, request)
    }
}

/// Adapts a closure to [`RedirectPredicate`].
pub struct ConditionalRedirect<F> {
    predicate: F,
}

impl<F> ConditionalRedirect<F>
where
    F: Fn(&ResponseHead, &RequestDescriptor) -> bool + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> std::fmt::Debug for ConditionalRedirect<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalRedirect").finish()
    }
}

impl<F> RedirectPredicate for ConditionalRedirect<F>
where
    F: Fn(&ResponseHead, &RequestDescriptor) -> bool + Send + Sync,
{
    fn should_redirect(&self, response: &ResponseHead, request: &RequestDescriptor) -> bool {
        (self.predicate)(response, request)
    }
}
