//! # keepsync-sync
//!
//! Sync command resolution and the bounded-time executor.
//!
//! Build a [`SyncCommand`] with [`SyncCommand::resolve`] and hand it to
//! [`SyncExecutor::execute`], which returns a [`SyncOutcome`] for every
//! attempt, including timeouts and launch failures.

pub mod command;
pub mod error;
pub mod executor;

pub use command::SyncCommand;
pub use error::SyncError;
pub use executor::{SyncExecutor, SyncOutcome};
