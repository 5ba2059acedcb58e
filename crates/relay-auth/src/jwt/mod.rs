//! JWT token verification, issuance, and claims.

pub mod claims;
pub mod decoder;
pub mod encoder;

pub use claims::Claims;
pub use decoder::JwtVerifier;
pub use encoder::{IssuedToken, JwtEncoder};
