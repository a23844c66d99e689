//! Credential material: signed assertions and the access tokens they are redeemed for.

pub mod assertion;
pub mod token;

pub use assertion::*;
pub use token::{access::*, secret::*};
