//! Bearer token identity.
//!
//! # Data Flow
//! ```text
//! login (application)
//!     → token.rs TokenService::issue (HS256, username + role claims, expiry)
//!     → compact token handed to the caller
//!
//! later request
//!     → authentication stage → TokenService::validate
//!     → Principal stored in request extensions
//!     → identity.rs AuthenticatedUser extractor in handlers that require a login
//! ```
//!
//! # Design Decisions
//! - Tokens are self-describing: no server-side session or revocation list
//! - No issuer or audience checks; only signature, expiry and a non-empty username
//! - The signing key is process-wide static configuration

pub mod identity;
pub mod token;

pub use identity::AuthenticatedUser;
pub use token::{Principal, TokenError, TokenService};
