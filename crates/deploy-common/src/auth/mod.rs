//! Token verification

mod jwt;

pub use jwt::{strip_bearer, AuthError, ClaimId, Claims, JwtService};
