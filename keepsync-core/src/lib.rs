//! keepsync core library: settings model, config file persistence, directory setup.
//!
//! Public API surface:
//! - [`settings`]: typed settings and the derived [`SyncConfig`]
//! - [`config`]: load / save / create `config.json`
//! - [`setup`]: one-shot directory preparation (`--setup`)
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod settings;
pub mod setup;

pub use config::{CreateOutcome, Layout};
pub use error::ConfigError;
pub use settings::{
    DatabaseSettings, GitSettings, NotificationSettings, Seconds, Settings, SyncConfig,
    SyncSettings,
};
pub use setup::{GitignoreUpdate, SetupReport};
