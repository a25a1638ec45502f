//! Social network clients used by followcheck.
//!
//! Only Instagram is implemented. [`graph::SocialGraph`] is the seam the audit
//! flow depends on, so it can be driven by a fake in tests.
pub mod graph;
pub mod instagram;

pub use graph::{Relationship, SocialGraph};
pub use instagram::{InstagramApi, LoginError, Session, SessionStore};
