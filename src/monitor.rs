use crate::{
    midi::{MidiInputStream, RawMidiMessage},
    Result,
};

use crossbeam_channel::{select, Receiver};
use log::{debug, info};
use std::fmt;
use std::io::Write;

/// Shown in place of the table when the MIDI subsystem can't be opened.
pub const ACCESS_FAILED_NOTICE: &str = "Failed to get MIDI access";

/// Only this many leading bytes of a message are displayed.
const DISPLAYED_BYTES: usize = 3;

pub fn format_bin(byte: u8) -> String {
    format!("{:08b}", byte)
}

pub fn format_dec(byte: u8) -> String {
    byte.to_string()
}

pub fn format_hex(byte: u8) -> String {
    format!("{:02X}", byte)
}

fn join_formatted(bytes: &[u8], format: fn(u8) -> String) -> String {
    bytes.iter().map(|b| format(*b)).collect::<Vec<_>>().join(" ")
}

/// The three renderings of one message's leading bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageTable {
    pub port_name: String,
    pub timestamp_ms: f64,
    pub binary: String,
    pub decimal: String,
    pub hex: String,
}

impl MessageTable {
    /// Messages shorter than three bytes render only the bytes they have.
    pub fn from_message(message: &RawMidiMessage) -> Self {
        let shown = &message.bytes[..message.bytes.len().min(DISPLAYED_BYTES)];
        if shown.len() < DISPLAYED_BYTES {
            debug!("Short MIDI message of {} bytes", shown.len());
        }

        MessageTable {
            port_name: message.port_name.clone(),
            timestamp_ms: message.timestamp_ms(),
            binary: join_formatted(shown, format_bin),
            decimal: join_formatted(shown, format_dec),
            hex: join_formatted(shown, format_hex),
        }
    }

    pub fn to_html(&self) -> String {
        format!(
            "<table>\n\
             <tr><th>Port</th><th>Timestamp</th><th>Binary</th><th>Decimal</th><th>Hex</th></tr>\n\
             <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n\
             </table>",
            escape_html(&self.port_name),
            self.timestamp_ms,
            self.binary,
            self.decimal,
            self.hex
        )
    }
}

impl fmt::Display for MessageTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<10}{}", "port", self.port_name)?;
        writeln!(f, "{:<10}{} ms", "timestamp", self.timestamp_ms)?;
        writeln!(f, "{:<10}{}", "binary", self.binary)?;
        writeln!(f, "{:<10}{}", "decimal", self.decimal)?;
        writeln!(f, "{:<10}{}", "hex", self.hex)
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }

    escaped
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayFormat {
    Text,
    Html,
}

impl DisplayFormat {
    pub fn render(self, table: &MessageTable) -> String {
        match self {
            DisplayFormat::Text => table.to_string(),
            DisplayFormat::Html => table.to_html(),
        }
    }
}

/// A display region. Every write replaces whatever was shown before.
pub trait Screen {
    fn replace(&mut self, content: &str) -> Result<()>;
}

pub struct TerminalScreen<W: Write> {
    out: W,
}

impl<W: Write> TerminalScreen<W> {
    pub fn new(out: W) -> Self {
        TerminalScreen { out }
    }
}

impl<W: Write> Screen for TerminalScreen<W> {
    fn replace(&mut self, content: &str) -> Result<()> {
        // Clear the terminal and home the cursor.
        write!(self.out, "\x1b[2J\x1b[H{}", content)?;
        if !content.ends_with('\n') {
            writeln!(self.out)?;
        }
        self.out.flush()?;

        Ok(())
    }
}

/// Shows every incoming MIDI message until cancelled.
pub struct MidiMonitor {
    canceller: Receiver<()>,
    format: DisplayFormat,
}

impl MidiMonitor {
    pub fn new(canceller: Receiver<()>, format: DisplayFormat) -> Self {
        MidiMonitor { canceller, format }
    }

    pub fn show_access_failed<S: Screen>(screen: &mut S) -> Result<()> {
        screen.replace(ACCESS_FAILED_NOTICE)
    }

    pub fn run<M: MidiInputStream, S: Screen>(&self, midi_input: M, screen: &mut S) -> Result<()> {
        let result = self.display_messages(midi_input.get_message_rx(), screen);
        midi_input.close();

        result
    }

    fn display_messages<S: Screen>(
        &self,
        message_rx: &Receiver<RawMidiMessage>,
        screen: &mut S,
    ) -> Result<()> {
        loop {
            select! {
                recv(message_rx) -> item => match item {
                    Ok(message) => {
                        let table = MessageTable::from_message(&message);
                        screen.replace(&self.format.render(&table))?;
                    }
                    Err(_) => {
                        info!("MIDI input closed");
                        return Ok(());
                    }
                },
                recv(self.canceller) -> _ => {
                    debug!("Interrupted MIDI monitor");
                    return Ok(());
                }
            }
        }
    }
}
