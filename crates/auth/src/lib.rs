//! `stockroom-auth` — single-operator authentication boundary.
//!
//! Static credential check plus signed session tokens. Decoupled from HTTP
//! and storage.

pub mod claims;
pub mod credentials;
pub mod jwt;

pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use credentials::StaticCredentials;
pub use jwt::{AuthError, Hs256JwtValidator, JwtValidator};
