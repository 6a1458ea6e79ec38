use crate::{Result, CHANNEL_MAX_BUFFER};

use crossbeam_channel::{self as channel, Receiver, TrySendError};
use log::{info, trace, warn};

pub fn list_midi_input_ports() -> Result<Vec<String>> {
    let midi_in = midir::MidiInput::new("partials_midi_temporary")?;
    let mut names = Vec::new();
    for port in midi_in.ports().iter() {
        names.push(midi_in.port_name(port)?);
    }

    Ok(names)
}

/// One message as delivered by an input port. Only lives long enough to be displayed.
#[derive(Clone, Debug, PartialEq)]
pub struct RawMidiMessage {
    pub port_name: String,
    /// Microseconds, as reported by the MIDI backend.
    pub timestamp: u64,
    pub bytes: Vec<u8>,
}

impl RawMidiMessage {
    pub fn new(port_name: impl Into<String>, timestamp: u64, bytes: &[u8]) -> Self {
        RawMidiMessage {
            port_name: port_name.into(),
            timestamp,
            bytes: bytes.to_vec(),
        }
    }

    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp as f64 / 1000.0
    }
}

/// Anything that produces MIDI messages on a channel.
pub trait MidiInputStream {
    fn get_message_rx(&self) -> &Receiver<RawMidiMessage>;

    fn close(self);
}

/// Subscribes to every MIDI input port present at connection time.
pub struct MidiInputDeviceStream {
    connections: Vec<midir::MidiInputConnection<()>>,
    message_rx: Receiver<RawMidiMessage>,
}

impl MidiInputDeviceStream {
    pub fn connect_all() -> Result<Self> {
        let (message_tx, message_rx) = channel::bounded(CHANNEL_MAX_BUFFER);

        // Each connection consumes its client, so the probe client is only used to enumerate.
        let probe = midir::MidiInput::new("partials_midi_probe")?;
        let ports = probe.ports();
        if ports.is_empty() {
            warn!("No MIDI input ports available");
        }

        let mut connections = Vec::with_capacity(ports.len());
        for (i, port) in ports.iter().enumerate() {
            let port_name = probe.port_name(port)?;
            let mut midi_in = midir::MidiInput::new(&format!("partials_midi_{}", i))?;
            midi_in.ignore(midir::Ignore::None);

            let message_tx = message_tx.clone();
            let callback_port_name = port_name.clone();
            let connection = midi_in.connect(
                port,
                "partials_input_connection",
                move |timestamp, message, _| {
                    let raw = RawMidiMessage::new(callback_port_name.as_str(), timestamp, message);
                    trace!("MIDI message {:?}", raw);
                    match message_tx.try_send(raw) {
                        Ok(()) => (),
                        Err(TrySendError::Full(_)) => warn!("Dropped MIDI message, display is behind"),
                        Err(TrySendError::Disconnected(_)) => (),
                    }
                },
                (),
            )?;
            info!("Listening on MIDI input port {}: {}", i, port_name);
            connections.push(connection);
        }

        Ok(MidiInputDeviceStream {
            connections,
            message_rx,
        })
    }

    pub fn num_ports(&self) -> usize {
        self.connections.len()
    }
}

impl MidiInputStream for MidiInputDeviceStream {
    fn get_message_rx(&self) -> &Receiver<RawMidiMessage> {
        &self.message_rx
    }

    fn close(self) {
        for connection in self.connections {
            connection.close();
        }
        info!("Closed MIDI input connections");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_reported_in_milliseconds() {
        let message = RawMidiMessage::new("port", 12_345, &[0x90, 0x3C, 0x40]);
        assert!((message.timestamp_ms() - 12.345).abs() < 1e-9);
    }
}
