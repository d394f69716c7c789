use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use config::{File, FileFormat};

use crate::core::{Error, Result};

/// Process-wide transmit settings, read-only after boot
#[derive(Debug, Clone, Copy)]
pub struct GeneralSettings {
    /// Byte count of each transmitted fragment
    pub fragment_size: usize,
    /// Inter-frame pacing in seconds
    pub frame_time: f64,
}

/// Boot-time description of one emulated station
#[derive(Debug, Clone)]
pub struct InterfaceConfig {
    /// Section name the interface was loaded from (`interface_1`, ...)
    pub name: String,
    /// TCP listen port, unique across interfaces
    pub port: u16,
    /// Station callsign
    pub callsign: String,
    /// Dial frequency in Hz
    pub frequency: u64,
    /// Audio offset in Hz
    pub offset: u64,
    /// Maidenhead grid locator
    pub maidenhead: String,
}

/// Fully validated emulator configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub general: GeneralSettings,
    pub interfaces: Vec<InterfaceConfig>,
}

/// Loads and validates an INI configuration file
pub fn load(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(Error::config(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    let path_str = path.to_str().ok_or_else(|| {
        Error::config(format!("non-UTF-8 config path: {}", path.display()))
    })?;

    let raw = config::Config::builder()
        .add_source(File::new(path_str, FileFormat::Ini))
        .build()
        .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;

    parse(raw)
}

/// Loads configuration from an in-memory INI string
pub fn load_str(ini: &str) -> Result<AppConfig> {
    let raw = config::Config::builder()
        .add_source(File::from_str(ini, FileFormat::Ini))
        .build()
        .map_err(|e| Error::config(e.to_string()))?;

    parse(raw)
}

fn parse(raw: config::Config) -> Result<AppConfig> {
    let sections: HashMap<String, HashMap<String, String>> = raw
        .try_deserialize()
        .map_err(|e| Error::config(e.to_string()))?;

    AppConfig::from_sections(sections)
}

impl AppConfig {
    fn from_sections(mut sections: HashMap<String, HashMap<String, String>>) -> Result<AppConfig> {
        let general = sections
            .remove("general")
            .ok_or_else(|| Error::config("missing [general] section"))?;

        let fragment_size: usize = require_parsed("general", &general, "fragment_size")?;
        let frame_time: f64 = require_parsed("general", &general, "frame_time")?;

        if fragment_size == 0 {
            return Err(Error::config("[general] fragment_size must be > 0"));
        }
        if !frame_time.is_finite() || frame_time <= 0.0 {
            return Err(Error::config("[general] frame_time must be > 0"));
        }

        // Section order is not preserved by the loader; sort by name so the
        // interface registry (and broadcast order) is deterministic.
        let mut names: Vec<String> = sections
            .keys()
            .filter(|name| name.starts_with("interface_"))
            .cloned()
            .collect();
        names.sort();

        let mut interfaces = Vec::with_capacity(names.len());
        for name in names {
            let values = &sections[&name];

            let port: u16 = require_parsed(&name, values, "port")?;
            let frequency: u64 = require_parsed(&name, values, "frequency")?;
            let offset: u64 = require_parsed(&name, values, "offset")?;
            let callsign = unquote(require(&name, values, "callsign")?).to_string();
            let maidenhead = unquote(require(&name, values, "maidenhead")?).to_string();

            if port == 0 {
                return Err(Error::config(format!("[{name}] port out of range: 0")));
            }
            if frequency == 0 {
                return Err(Error::config(format!("[{name}] frequency must be > 0")));
            }
            if offset == 0 {
                return Err(Error::config(format!("[{name}] offset must be > 0")));
            }
            if callsign.is_empty() {
                return Err(Error::config(format!("[{name}] callsign must be non-empty")));
            }
            if maidenhead.is_empty() {
                return Err(Error::config(format!(
                    "[{name}] maidenhead must be non-empty"
                )));
            }

            interfaces.push(InterfaceConfig {
                name,
                port,
                callsign,
                frequency,
                offset,
                maidenhead,
            });
        }

        if interfaces.is_empty() {
            return Err(Error::config("no [interface_*] sections found"));
        }

        let mut seen_ports = HashSet::new();
        let mut seen_callsigns = HashSet::new();
        for iface in &interfaces {
            if !seen_ports.insert(iface.port) {
                return Err(Error::config(format!(
                    "[{}] duplicate port {}",
                    iface.name, iface.port
                )));
            }
            if !seen_callsigns.insert(iface.callsign.to_ascii_uppercase()) {
                return Err(Error::config(format!(
                    "[{}] duplicate callsign {}",
                    iface.name, iface.callsign
                )));
            }
        }

        Ok(AppConfig {
            general: GeneralSettings {
                fragment_size,
                frame_time,
            },
            interfaces,
        })
    }
}

fn require<'a>(
    section: &str,
    values: &'a HashMap<String, String>,
    key: &str,
) -> Result<&'a str> {
    values
        .get(key)
        .map(|v| v.as_str())
        .ok_or_else(|| Error::config(format!("[{section}] missing key '{key}'")))
}

fn require_parsed<T: FromStr>(
    section: &str,
    values: &HashMap<String, String>,
    key: &str,
) -> Result<T> {
    let raw = unquote(require(section, values, key)?);
    raw.parse()
        .map_err(|_| Error::config(format!("[{section}] invalid value for '{key}': {raw:?}")))
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
