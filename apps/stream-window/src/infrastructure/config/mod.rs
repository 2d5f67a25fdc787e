//! Configuration Module
//!
//! Configuration loading for the stream window service.

mod settings;

pub use settings::{
    AppConfig, ConfigError, FeedSettings, HistorySettings, ServerSettings, WindowSettings,
};
