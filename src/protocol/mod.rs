//! Wire protocol for the JS8Call service interface.
//!
//! One message per line: a JSON object with `type`, `value`, and `params`
//! keys, terminated by a line feed. No length framing, no handshake.

pub mod codec;
pub mod message;

pub use self::codec::LineCodec;
pub use self::message::{kind, Message, SPEED_NORMAL, UNSOLICITED_ID};
