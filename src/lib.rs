//! JS8Emu: development-time emulator of the JS8Call service interface
//!
//! This library replaces radios and airwaves with local TCP endpoints so
//! that applications written against the JS8Call API can be iterated on in
//! seconds while still seeing production message framing, frame timing,
//! and PTT sequencing.

pub mod core;
pub mod network;
pub mod protocol;
pub mod station;
pub mod transmit;
pub mod util;

// Re-export commonly used items
pub use self::core::{AppConfig, Error, GeneralSettings, InterfaceConfig, Result};
pub use self::network::Server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
