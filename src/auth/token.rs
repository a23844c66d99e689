//! Access token models owned by the token cache.

pub mod access;
pub mod secret;
