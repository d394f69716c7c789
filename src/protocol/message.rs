use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Message type tags understood on the wire
pub mod kind {
    pub const STATION_GET_CALLSIGN: &str = "STATION.GET_CALLSIGN";
    pub const STATION_CALLSIGN: &str = "STATION.CALLSIGN";
    pub const STATION_STATUS: &str = "STATION.STATUS";
    pub const RIG_GET_FREQ: &str = "RIG.GET_FREQ";
    pub const RIG_FREQ: &str = "RIG.FREQ";
    pub const RIG_SET_FREQ: &str = "RIG.SET_FREQ";
    pub const RIG_PTT: &str = "RIG.PTT";
    pub const TX_SEND_MESSAGE: &str = "TX.SEND_MESSAGE";
    pub const RX_ACTIVITY: &str = "RX.ACTIVITY";
    pub const RX_DIRECTED: &str = "RX.DIRECTED";
    pub const RX_SPOT: &str = "RX.SPOT";
}

/// `_ID` carried by every message the emulator originates on its own
pub const UNSOLICITED_ID: i64 = -1;

/// JS8 "normal" speed reported in status and RX frames
pub const SPEED_NORMAL: i64 = 1;

/// One wire message: a JSON object with `type`, `value`, and `params`
///
/// `value` is always a string (possibly empty); `params` members depend on
/// the message type. Field order on the wire is immaterial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Message {
    fn from_parts(kind: &str, value: impl Into<String>, params: Value) -> Message {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Message {
            kind: kind.to_string(),
            value: value.into(),
            params,
        }
    }

    /// STATION.CALLSIGN reply; `id` echoes the request's `_ID` as an integer
    pub fn station_callsign(id: i64, callsign: &str) -> Message {
        Message::from_parts(kind::STATION_CALLSIGN, callsign, json!({ "_ID": id }))
    }

    /// RIG.FREQ reply carrying the interface's current tuning
    pub fn rig_freq(id: i64, dial: u64, offset: u64) -> Message {
        Message::from_parts(
            kind::RIG_FREQ,
            "",
            json!({
                "DIAL": dial,
                "FREQ": dial + offset,
                "OFFSET": offset,
                "_ID": id,
            }),
        )
    }

    /// Unsolicited STATION.STATUS; `status_id` is serialized as a string
    pub fn station_status(dial: u64, offset: u64, status_id: i64) -> Message {
        Message::from_parts(
            kind::STATION_STATUS,
            "",
            json!({
                "DIAL": dial,
                "FREQ": dial + offset,
                "OFFSET": offset,
                "SELECTED": "",
                "SPEED": SPEED_NORMAL,
                "_ID": status_id.to_string(),
            }),
        )
    }

    /// RIG.PTT keying indication for the transmitting station
    pub fn rig_ptt(on: bool, utc: i64) -> Message {
        Message::from_parts(
            kind::RIG_PTT,
            if on { "on" } else { "off" },
            json!({
                "PTT": on,
                "UTC": utc,
                "_ID": UNSOLICITED_ID,
            }),
        )
    }

    /// RX.ACTIVITY carrying one received fragment
    pub fn rx_activity(
        fragment: &str,
        dial: u64,
        offset: u64,
        snr: i64,
        tdrift: f64,
        utc: i64,
    ) -> Message {
        Message::from_parts(
            kind::RX_ACTIVITY,
            fragment,
            json!({
                "DIAL": dial,
                "FREQ": dial + offset,
                "OFFSET": offset,
                "SNR": snr,
                "SPEED": SPEED_NORMAL,
                "TDRIFT": tdrift,
                "UTC": utc,
                "_ID": UNSOLICITED_ID,
            }),
        )
    }

    /// RX.DIRECTED presenting the reassembled, terminated message
    #[allow(clippy::too_many_arguments)]
    pub fn rx_directed(
        text: &str,
        from: &str,
        to: &str,
        dial: u64,
        offset: u64,
        snr: i64,
        tdrift: f64,
        utc: i64,
    ) -> Message {
        Message::from_parts(
            kind::RX_DIRECTED,
            text,
            json!({
                "CMD": " ",
                "DIAL": dial,
                "EXTRA": "",
                "FREQ": dial + offset,
                "FROM": from,
                "GRID": "",
                "OFFSET": offset,
                "SNR": snr,
                "SPEED": SPEED_NORMAL,
                "TDRIFT": tdrift,
                "TEXT": text,
                "TO": to,
                "UTC": utc,
                "_ID": UNSOLICITED_ID,
            }),
        )
    }

    /// RX.SPOT announcing the originating station and its grid
    pub fn rx_spot(call: &str, grid: &str, dial: u64, offset: u64, snr: i64) -> Message {
        Message::from_parts(
            kind::RX_SPOT,
            "",
            json!({
                "CALL": call,
                "DIAL": dial,
                "FREQ": dial + offset,
                "GRID": format!(" {grid}"),
                "OFFSET": offset,
                "SNR": snr,
                "_ID": UNSOLICITED_ID,
            }),
        )
    }

    /// Extracts the request's `_ID`.
    ///
    /// Clients send `_ID` as a decimal string; an already-integer `_ID` is
    /// accepted too. The integer form is what replies must echo.
    pub fn request_id(&self) -> Option<i64> {
        match self.params.get("_ID")? {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Reads an unsigned numeric param, tolerating a decimal-string form
    pub fn param_u64(&self, key: &str) -> Option<u64> {
        match self.params.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
