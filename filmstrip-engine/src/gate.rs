//! Deferral of layout-dependent work until the viewport has real bounds

use filmstrip_core::ViewportState;

/// Holds a pending request while the viewport has zero size.
///
/// The request is handed out exactly once, on the first layout pass that
/// reports non-zero bounds.
#[derive(Debug)]
pub struct ReadinessGate<T> {
    pending: Option<T>,
}

impl<T> ReadinessGate<T> {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Stores `item` as the pending request, replacing any older one.
    ///
    /// Returns true if nothing was pending before, i.e. a layout pass still
    /// has to be requested.
    pub fn defer(&mut self, item: T) -> bool {
        self.pending.replace(item).is_none()
    }

    /// Takes the pending request if `viewport` now has bounds
    pub fn release(&mut self, viewport: &ViewportState) -> Option<T> {
        if !viewport.has_bounds() {
            return None;
        }
        self.pending.take()
    }

    /// Drops the pending request without running it
    pub fn clear(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<T> Default for ReadinessGate<T> {
    fn default() -> Self {
        Self::new()
    }
}
