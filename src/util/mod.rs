//! Utility module
//!
//! Clock access and the bounded random draws used for emulated signal
//! reports.

use chrono::Utc;
use rand::Rng;

/// Epoch offset subtracted from wall time to form STATION.STATUS ids
pub const STATUS_ID_EPOCH_MS: i64 = 1_499_299_200_000;

/// Current wall time in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Identifier carried by an unsolicited STATION.STATUS
pub fn station_status_id() -> i64 {
    now_ms() - STATUS_ID_EPOCH_MS
}

/// Draws an emulated signal-to-noise ratio in dB
pub fn rand_snr() -> i64 {
    rand::thread_rng().gen_range(-20..=20)
}

/// Draws an emulated receiver timing drift in ms
pub fn rand_tdrift() -> f64 {
    rand::thread_rng().gen_range(-2.0..=2.0)
}

/// Converts a floating-point number of seconds to a duration
pub fn secs_to_duration(secs: f64) -> std::time::Duration {
    std::time::Duration::from_secs_f64(secs)
}
