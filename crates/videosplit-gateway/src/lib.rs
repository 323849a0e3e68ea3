//! Session-aware request gateway for the videosplit API
//!
//! Every outbound call goes through `SessionGateway`, which attaches the
//! bearer credential from the `CredentialStore`, and on a 401 recovers the
//! session with a single coordinated refresh before replaying the request
//! once. Concurrent requests that fault together share that refresh: they
//! all replay with the same new credential or all fail with the same reason.
//!
//! Request flow:
//! 1. Attach `Authorization: Bearer <access>` and send
//! 2. Non-401 response → returned to the caller as-is
//! 3. 401 → join the refresh flight (leader starts it, followers wait)
//! 4. Refreshed → replay once; a second 401 fails with `AuthExpired`
//! 5. Rejected → session cleared, `LogoutHook` fired once, `RefreshFailed`

pub mod classify;
pub mod error;
pub mod flight;
pub mod gateway;
pub mod logout;
pub mod request;

pub use classify::{classify_status, extract_detail};
pub use error::{Error, FailureKind, Result};
pub use flight::{Flight, SingleFlight};
pub use gateway::{GatewayConfig, NO_BODY, SessionGateway};
pub use logout::{LogoutHook, TracingLogout};
pub use request::{FilePart, MultipartBody, PartSource, RequestBody, RequestOptions};
