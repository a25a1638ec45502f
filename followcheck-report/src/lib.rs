//! Follower/following comparison and the plain-text report it produces.
//!
//! [`compare`] turns two username lists into the two set differences;
//! [`writer`] puts each difference into its own file, one username per line.
pub mod compare;
pub mod writer;

pub use compare::{Comparison, Relationships};
pub use writer::{ReportPaths, ReportWriter};
