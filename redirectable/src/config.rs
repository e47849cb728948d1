//! Redirect policy configuration.
//!
//! This module contains the wrapper-level and per-request knobs:
//! - [`RedirectConfig`]: Default limits applied by a [`Redirectable`](crate::Redirectable)
//! - [`BodyLimit`]: Cumulative request body accounting
//! - [`BeforeRedirect`] / [`RedirectPredicate`]: Hooks run between hops

mod hooks;
mod limits;

pub use hooks::{
    BeforeRedirect, Chain, ConditionalRedirect, HeaderHook, RedirectHook, RedirectPredicate,
};
pub use limits::{defaults, BodyLimit, RedirectConfig};
