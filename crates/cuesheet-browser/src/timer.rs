//! Timers for the hover grace period and deferred work.
//!
//! The editor only hands out [`DismissToken`]s; this module owns the real
//! browser timeouts. Every timeout lives in a slot: replacing or cancelling it
//! drops the handle, which clears the timeout and frees its closure.

use cuesheet_core::DismissToken;
use gloo_timers::callback::Timeout;

/// The single outstanding dismiss timeout, if any.
#[derive(Default)]
pub struct DismissTimer {
    pending: Option<(DismissToken, Timeout)>,
}

impl DismissTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a timeout that reports `token` after `after_ms`, replacing any pending one.
    pub fn schedule(
        &mut self,
        token: DismissToken,
        after_ms: u32,
        on_elapsed: impl FnOnce(DismissToken) + 'static,
    ) {
        self.cancel();
        tracing::trace!(target: "cuesheet::timer", token = token.0, after_ms, "dismiss scheduled");
        let timeout = Timeout::new(after_ms, move || on_elapsed(token));
        self.pending = Some((token, timeout));
    }

    pub fn cancel(&mut self) {
        if let Some((token, timeout)) = self.pending.take() {
            tracing::trace!(target: "cuesheet::timer", token = token.0, "dismiss cancelled");
            drop(timeout);
        }
    }

    pub fn pending(&self) -> Option<DismissToken> {
        self.pending.as_ref().map(|(token, _)| *token)
    }

    /// Release a timeout that has fired.
    ///
    /// Safe to call from inside its own callback: wasm-bindgen frees a running
    /// closure only once the call returns. Returns the released handle so callers
    /// can drop it after their own borrows end.
    pub fn fired(&mut self, token: DismissToken) -> Option<Timeout> {
        if self.pending() != Some(token) {
            return None;
        }
        self.pending.take().map(|(_, timeout)| timeout)
    }
}

/// One deferred callback at a time.
///
/// Scheduling again replaces the earlier callback. A fired handle is kept until
/// the next schedule or cancel.
#[derive(Default)]
pub struct DeferredTask {
    pending: Option<Timeout>,
}

impl DeferredTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on the next macrotask.
    pub fn next_tick(&mut self, f: impl FnOnce() + 'static) {
        self.after(0, f);
    }

    /// Run `f` after `ms` milliseconds.
    pub fn after(&mut self, ms: u32, f: impl FnOnce() + 'static) {
        self.pending = Some(Timeout::new(ms, f));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }
}
