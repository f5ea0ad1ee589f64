//! Visibility/focus gate.
//!
//! A page renders only while it is visible and focused; otherwise the worker
//! is the fallback path. The worker in turn stands down while the host reports
//! a visible, focused page. A gated-out surface neither claims nor renders.

use peppermint_common::types::{SurfaceContext, Visibility};

/// Whether a surface in `context` should attempt delivery at all.
pub fn admits(context: &SurfaceContext) -> bool {
    match *context {
        SurfaceContext::Worker { focused_client } => !focused_client,
        SurfaceContext::Page {
            visibility,
            has_focus,
        } => visibility == Visibility::Visible && has_focus,
    }
}
