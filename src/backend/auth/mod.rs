//! Authentication Module
//!
//! The chat hub does not issue or check tokens itself. This module extracts
//! the credential from an upgrade request and asks the account service who
//! it belongs to.
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs          - Module exports and documentation
//! ├── credential.rs   - Credential extraction and origin checks
//! └── verifier.rs     - Identity verifier trait and HTTP implementation
//! ```
//!
//! # Authentication Flow
//!
//! 1. **Extract**: `?token=` query parameter, else `Authorization: Bearer`
//! 2. **Verify**: `GET /api/me` on the account service, under a timeout
//! 3. **Degrade**: any failure yields an anonymous, receive-only session
//!    (unless anonymous access is disabled, in which case the upgrade is
//!    refused with 401)

/// Credential extraction and origin checks
pub mod credential;

/// Identity verifier
pub mod verifier;

pub use credential::{extract_credential, origin_allowed};
pub use verifier::{resolve_identity, HttpIdentityVerifier, IdentityVerifier, VerifyError};
