//! Bearer-token authentication. Tokens are minted elsewhere; this service only
//! verifies them against `JWT_SECRET`.

pub mod claims;
pub mod extractors;
pub mod guards;
pub mod middleware;

pub use claims::{AuthUser, Claims};
pub use extractors::ClientIp;
