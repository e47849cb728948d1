use std::future;

use tokio::time::{sleep_until, Instant};

/// The single timer of a chain.
///
/// Re-arming replaces the previous deadline; it spans every hop.
#[derive(Debug, Default)]
pub(crate) struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub(crate) fn set(&mut self, at: Option<Instant>) {
        self.at = at;
    }

    pub(crate) fn clear(&mut self) {
        self.at = None;
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Resolves when the deadline passes; never resolves while unarmed.
    pub(crate) async fn expired(&self) {
        match self.at {
            Some(at) => sleep_until(at).await,
            None => future::pending().await,
        }
    }
}
