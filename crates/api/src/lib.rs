//! HTTP surface of the push origin: notify webhooks and device token
//! registration.

pub mod middleware;
pub mod routes;
pub mod state;
