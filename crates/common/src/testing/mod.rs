//! Test doubles shared by the unit and integration tests
//!
//! - **[`mocks`]**: a classified [`TestError`] and a [`FlakyOperation`] that
//!   fails a scripted number of times before succeeding
//! - **[`async_utils`]**: polling helpers for background tasks
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "test-utils")]
//! # {
//! use assistkit_common::error::ErrorKind;
//! use assistkit_common::testing::FlakyOperation;
//!
//! let op = FlakyOperation::new(2, ErrorKind::Timeout);
//! assert!(op.invoke().is_err());
//! assert!(op.invoke().is_err());
//! assert_eq!(op.invoke().unwrap(), 3);
//! # }
//! ```

pub mod async_utils;
pub mod mocks;

pub use async_utils::{poll_until, wait_for_count};
pub use mocks::{FlakyOperation, TestError};

pub use crate::resilience::{Clock, MockClock, SystemClock};
