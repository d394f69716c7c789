//! Core types shared across the emulator.
//!
//! This module contains the error type, the configuration model, and the
//! constants used throughout the library.

pub mod config;
pub mod error;

pub use self::config::{AppConfig, GeneralSettings, InterfaceConfig};
pub use self::error::{Error, Result};

/// Configuration path used when the CLI does not name one
pub const DEFAULT_CONFIG_PATH: &str = "config.ini";
