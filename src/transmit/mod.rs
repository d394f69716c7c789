//! Transmit scheduler.
//!
//! Converts one accepted TX.SEND_MESSAGE into a timed sequence of receive
//! fragments on every co-frequency interface, bracketing each frame with
//! PTT keying on the sender, and finishing with the directed-message and
//! spot pair receivers expect.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::core::GeneralSettings;
use crate::protocol::Message;
use crate::station::{Interface, Registry};
use crate::util;

/// Five-byte terminator appended to a completed transmission: space,
/// black diamond (U+2666), space
pub const MESSAGE_TERMINATOR: &str = " \u{2666} ";

/// Splits a payload into consecutive byte slices of `fragment_size`.
///
/// The final fragment may be shorter; nothing is padded. The split is a raw
/// byte split, so a cut inside a multi-byte character is re-encoded with
/// U+FFFD replacement when the fragment is framed as JSON.
pub fn fragment_payload(payload: &str, fragment_size: usize) -> Vec<String> {
    payload
        .as_bytes()
        .chunks(fragment_size.max(1))
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

/// The addressee of a payload: its second whitespace-delimited word
pub fn addressee(payload: &str) -> &str {
    payload.split_whitespace().nth(1).unwrap_or("")
}

/// One accepted transmission in flight
pub struct TransmitJob {
    origin: Arc<Interface>,
    payload: String,
    fragments: Vec<String>,
    destinations: Vec<Arc<Interface>>,
    frame_time: Duration,
}

impl TransmitJob {
    /// Builds a job from an accepted TX.SEND_MESSAGE, snapshotting the
    /// destination set. Returns `None` for an empty payload.
    pub fn new(
        origin: Arc<Interface>,
        registry: &Registry,
        settings: &GeneralSettings,
        payload: String,
    ) -> Option<TransmitJob> {
        let fragments = fragment_payload(&payload, settings.fragment_size);
        if fragments.is_empty() {
            debug!("{}: ignoring empty transmission", origin.name());
            return None;
        }

        let destinations = registry.co_channel(&origin);
        Some(TransmitJob {
            origin,
            payload,
            fragments,
            destinations,
            frame_time: util::secs_to_duration(settings.frame_time),
        })
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn destinations(&self) -> &[Arc<Interface>] {
        &self.destinations
    }

    /// Runs the job to completion: one paced frame per fragment, then the
    /// terminating RX.DIRECTED + RX.SPOT pair.
    ///
    /// A sender disconnect does not cancel the job; the transmission is
    /// already on the air. Receivers that vanish mid-job simply stop
    /// getting frames.
    pub async fn run(self) {
        debug!(
            "{}: transmitting {} fragment(s) to {} interface(s)",
            self.origin.name(),
            self.fragments.len(),
            self.destinations.len()
        );

        for fragment in &self.fragments {
            self.origin.broadcast(Message::rig_ptt(true, util::now_ms()));
            tokio::time::sleep(self.frame_time).await;
            self.origin.broadcast(Message::rig_ptt(false, util::now_ms()));

            for dest in &self.destinations {
                let dial = dest.dial();
                for conn in dest.connections() {
                    conn.send(Message::rx_activity(
                        fragment,
                        dial,
                        dest.offset(),
                        util::rand_snr(),
                        util::rand_tdrift(),
                        util::now_ms(),
                    ));
                }
            }
        }

        let text = format!("{}{}", self.payload, MESSAGE_TERMINATOR);
        let to = addressee(&self.payload);

        for dest in &self.destinations {
            let dial = dest.dial();
            for conn in dest.connections() {
                let snr = util::rand_snr();
                let directed = Message::rx_directed(
                    &text,
                    self.origin.callsign(),
                    to,
                    dial,
                    dest.offset(),
                    snr,
                    util::rand_tdrift(),
                    util::now_ms(),
                );
                // The spot shares the directed message's SNR and must ride
                // in the same write
                let spot = Message::rx_spot(
                    self.origin.callsign(),
                    self.origin.grid(),
                    dial,
                    dest.offset(),
                    snr,
                );
                conn.send_batch(vec![directed, spot]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InterfaceConfig;
    use crate::network::connection::ConnectionHandle;
    use serde_json::json;

    fn config(name: &str, callsign: &str, frequency: u64, offset: u64) -> InterfaceConfig {
        InterfaceConfig {
            name: name.to_string(),
            port: 0,
            callsign: callsign.to_string(),
            frequency,
            offset,
            maidenhead: "JO01".to_string(),
        }
    }

    fn settings() -> GeneralSettings {
        GeneralSettings {
            fragment_size: 4,
            frame_time: 0.001,
        }
    }

    #[test]
    fn test_fragment_payload_no_padding() {
        let fragments = fragment_payload("ABCDEFGHI", 4);
        assert_eq!(fragments, vec!["ABCD", "EFGH", "I"]);
        assert_eq!(fragments.concat(), "ABCDEFGHI");
    }

    #[test]
    fn test_fragment_payload_exact_multiple() {
        assert_eq!(fragment_payload("ABCDEFGH", 4), vec!["ABCD", "EFGH"]);
    }

    #[test]
    fn test_fragment_payload_empty() {
        assert!(fragment_payload("", 4).is_empty());
    }

    #[test]
    fn test_fragment_split_is_byte_based() {
        // 'é' is two bytes; a size-1 split cuts through it
        let fragments = fragment_payload("é", 1);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0], "\u{FFFD}");
    }

    #[test]
    fn test_addressee_is_second_word() {
        assert_eq!(addressee("M0PXO: 2E0FGO +E65"), "2E0FGO");
        assert_eq!(addressee("ABCDEFGHI"), "");
        assert_eq!(addressee(""), "");
    }

    #[test]
    fn test_terminator_is_five_bytes() {
        assert_eq!(MESSAGE_TERMINATOR.as_bytes(), b" \xe2\x99\xa6 ");
    }

    #[test]
    fn test_empty_payload_yields_no_job() {
        let registry = Registry::new(&[config("interface_1", "2E0FGO", 3578000, 1250)]);
        let origin = registry.get("interface_1").unwrap().clone();
        assert!(TransmitJob::new(origin, &registry, &settings(), String::new()).is_none());
    }

    #[test]
    fn test_destination_set_is_snapshotted() {
        let registry = Registry::new(&[
            config("interface_1", "2E0FGO", 3578000, 1250),
            config("interface_2", "M0PXO", 3578000, 700),
        ]);
        let origin = registry.get("interface_1").unwrap().clone();
        let job = TransmitJob::new(origin, &registry, &settings(), "HELLO".to_string()).unwrap();
        assert_eq!(job.destinations().len(), 1);

        // An interface retuning mid-job does not affect the captured set
        registry.get("interface_2").unwrap().set_dial(7078000);
        assert_eq!(job.destinations().len(), 1);
        assert_eq!(job.destinations()[0].name(), "interface_2");
    }

    #[tokio::test]
    async fn test_run_paces_ptt_and_delivers_fragments() {
        let registry = Registry::new(&[
            config("interface_1", "2E0FGO", 3578000, 1250),
            config("interface_2", "G8XYZ", 3578000, 700),
            config("interface_3", "K1ABC", 7078000, 2100),
        ]);
        let origin = registry.get("interface_1").unwrap().clone();
        let receiver = registry.get("interface_2").unwrap().clone();
        let off_channel = registry.get("interface_3").unwrap().clone();

        let (sender_conn, mut sender_rx) = ConnectionHandle::test_pair();
        let (receiver_conn, mut receiver_rx) = ConnectionHandle::test_pair();
        let (off_conn, mut off_rx) = ConnectionHandle::test_pair();
        origin.attach(sender_conn);
        receiver.attach(receiver_conn);
        off_channel.attach(off_conn);

        let job =
            TransmitJob::new(origin, &registry, &settings(), "ABCDEFGHI".to_string()).unwrap();
        job.run().await;

        // Sender: PTT on/off per fragment, nothing else
        let mut ptt_values = Vec::new();
        while let Ok(batch) = sender_rx.try_recv() {
            for msg in batch {
                assert_eq!(msg.kind, "RIG.PTT");
                assert_eq!(msg.params["_ID"], json!(-1));
                ptt_values.push(msg.value);
            }
        }
        assert_eq!(ptt_values, vec!["on", "off", "on", "off", "on", "off"]);

        // Receiver: in-order fragments, then directed + spot in one batch
        let mut activity = Vec::new();
        let mut last_batch = Vec::new();
        while let Ok(batch) = receiver_rx.try_recv() {
            if batch[0].kind == "RX.ACTIVITY" {
                assert_eq!(batch.len(), 1);
                activity.push(batch[0].clone());
            } else {
                last_batch = batch;
            }
        }
        let values: Vec<&str> = activity.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, vec!["ABCD", "EFGH", "I"]);
        for msg in &activity {
            assert_eq!(msg.params["DIAL"], json!(3578000));
            assert_eq!(msg.params["FREQ"], json!(3578700));
            let snr = msg.params["SNR"].as_i64().unwrap();
            assert!((-20..=20).contains(&snr));
            let tdrift = msg.params["TDRIFT"].as_f64().unwrap();
            assert!((-2.0..=2.0).contains(&tdrift));
        }

        assert_eq!(last_batch.len(), 2);
        let directed = &last_batch[0];
        let spot = &last_batch[1];
        assert_eq!(directed.kind, "RX.DIRECTED");
        assert_eq!(directed.value, "ABCDEFGHI \u{2666} ");
        assert_eq!(directed.params["TEXT"], json!("ABCDEFGHI \u{2666} "));
        assert_eq!(directed.params["FROM"], json!("2E0FGO"));
        assert_eq!(directed.params["TO"], json!(""));
        assert_eq!(spot.kind, "RX.SPOT");
        assert_eq!(spot.params["CALL"], json!("2E0FGO"));
        assert_eq!(spot.params["GRID"], json!(" JO01"));
        assert_eq!(spot.params["SNR"], directed.params["SNR"]);

        // An interface on another dial frequency hears nothing
        assert!(off_rx.try_recv().is_err());
    }
}
