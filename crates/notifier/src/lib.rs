//! Push origin: turns app activity into push messages and fans them out to
//! every registered device token.

pub mod compose;
pub mod fcm;
pub mod tokens;
pub mod transport;
