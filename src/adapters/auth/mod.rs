//! Authentication adapters.
//!
//! - `jwt` - HS256 bearer token validation (`SessionValidator`)
//! - `mock` - Test validator without a real identity provider
//! - `credentials` - Fixed client-side `CredentialProvider`

mod credentials;
mod jwt;
mod mock;

pub use credentials::StaticCredentialProvider;
pub use jwt::{JwtConfig, JwtSessionValidator};
pub use mock::MockSessionValidator;
