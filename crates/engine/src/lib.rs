//! Duplicate-notification suppression for delivery surfaces.
//!
//! Every surface (background worker, open pages) that receives the same push
//! runs it through [`surface::DeliverySurface::handle`]. The surface gates on
//! visibility/focus, derives a content tag via [`fingerprint`], and claims the
//! tag through a [`coordinator::ClaimCoordinator`] before rendering.

pub mod coordinator;
pub mod event;
pub mod fingerprint;
pub mod gate;
pub mod hub;
pub mod suppression;
pub mod surface;
