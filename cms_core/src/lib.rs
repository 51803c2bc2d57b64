//! # CMS Core
//!
//! Authorization core of the CMS admin dashboard.
//!
//! 1. **Permission Model**: a fixed capability vocabulary plus a wildcard
//!    `all` flag; [`has_permission`] answers whether a set satisfies a
//!    requirement (fail-closed, list = any-of).
//!
//! 2. **Session Context**: the current role and permission set, fetched from
//!    the backend profile endpoint once per session and shared by reference.
//!
//! 3. **Guards**: hide, disable or lock a permission-gated element.
//!
//! 4. **API Client**: one fetch wrapper adding auth headers, surfacing errors
//!    and publishing a typed revocation event.

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod permission;
pub mod revocation;
pub mod role;
pub mod session;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use credentials::{CredentialStore, Credentials, FileCredentialStore, InMemoryCredentialStore};
pub use error::{ApiError, ApiResult, ConfigError, CredentialError};
pub use guard::{Guard, GuardBehavior, GuardOutcome, Guardable};
pub use permission::{has_permission, Capability, PermissionSet, Requirement};
pub use revocation::{RevocationChannel, RevocationEvent};
pub use role::{Profile, Role};
pub use session::{ProfileSource, Session, SessionContext, SessionState};
