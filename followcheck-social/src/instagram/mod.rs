//! Instagram private (mobile) API integration.
//!
//! [`client`] wraps the shared HTTP client with the login, two-factor and
//! friendship endpoints; [`session`] persists the login between runs; [`types`]
//! holds the response models.
pub mod client;
pub mod session;
pub mod types;

pub use client::{ApiSettings, InstagramApi, LoginError};
pub use session::{Session, SessionStore};
pub use types::{TwoFactorChallenge, UserShort};
