//! Shared types for XyraChain

pub mod error;
pub mod notice;

pub use error::{ErrorCategory, Result, XyraError};
pub use notice::{Notice, NoticeLevel, Notifier};
