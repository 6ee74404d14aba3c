//! Structured logging for edit operations
//!
//! Planning, purging and history operations each emit a `start` event and
//! then either an `end` or an `end_error` event, all carrying the same `op`.
//! Field names come from [`geoedit_core_types::schema`]; failures are
//! reported through [`ExError`](crate::errors::ExError) so the `err_code`
//! field is stable across releases.
//!
//! Binaries call [`init`] once at startup. Tests call
//! [`init_test_capture`] and assert on the captured events instead.
//!
//! ```rust
//! use geoedit_core::logging_facility::{init, Profile};
//!
//! init(Profile::Production);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
