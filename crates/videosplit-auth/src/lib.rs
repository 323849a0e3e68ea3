//! Session credentials for the videosplit API client
//!
//! Owns the credential pair and the last-known user profile, persisted in a
//! single JSON session file, plus the call to the refresh endpoint that
//! trades a refresh token for a new pair. Issuing credentials (login,
//! registration, OAuth) happens elsewhere; this crate only stores, reads,
//! rotates and clears them.
//!
//! Session lifecycle:
//! 1. Process start: `CredentialStore::load()` restores the persisted session
//! 2. The gateway reads `access_token()` for every outbound request
//! 3. On a 401 the gateway calls `token::refresh_token()` once (single flight)
//! 4. Success: `CredentialStore::set_credentials()` replaces the pair
//! 5. Rejection: `CredentialStore::clear()` tears the session down

pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod profile;
pub mod token;

pub use credentials::{CredentialPair, CredentialStore};
pub use endpoints::*;
pub use error::{Error, Result};
pub use profile::{PlanTier, Profile};
pub use token::{TokenResponse, refresh_token};
