//! AgroBridge engine: API client, identity seam and effect execution.
mod auth;
mod client;
mod config;
mod endpoints;
mod engine;
mod error;
mod session;

pub use auth::{AuthError, IdentityBackend, LocalIdentityBackend};
pub use client::ApiClient;
pub use config::{ApiSettings, API_URL_ENV, DEFAULT_API_URL};
pub use engine::{EngineEvent, EngineHandle};
pub use error::{ApiError, ApiErrorKind};
pub use session::SessionProvider;
