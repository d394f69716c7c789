use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use super::message::Message;
use crate::core::Error;

/// Newline-delimited JSON codec for the JS8Call service protocol
///
/// Each frame is one JSON object terminated by a line-feed byte. Malformed
/// lines are dropped with a warning; the stream itself stays usable.
#[derive(Clone, Default)]
pub struct LineCodec;

impl LineCodec {
    /// Creates a new line codec
    pub fn new() -> Self {
        LineCodec
    }
}

impl Decoder for LineCodec {
    type Item = Message;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(pos) = src.iter().position(|b| *b == b'\n') else {
                // Need more data to complete a line
                return Ok(None);
            };

            let line = src.split_to(pos + 1);
            let line = &line[..line.len() - 1];

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match serde_json::from_slice::<Message>(line) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => {
                    warn!("dropping malformed frame: {}", e);
                    continue;
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None => {
                // Trailing bytes without a newline are an incomplete frame
                src.clear();
                Ok(None)
            }
        }
    }
}

impl Encoder<Message> for LineCodec {
    type Error = Error;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item)
            .map_err(|e| Error::protocol(format!("failed to serialize message: {}", e)))?;

        dst.reserve(json.len() + 1);
        dst.extend_from_slice(&json);
        dst.put_u8(b'\n');

        Ok(())
    }
}
