mod audio_device;
mod error;
mod graph;
mod instrument;
mod midi;
mod monitor;
mod param;
mod synthesizer;
mod timer;
mod wave_table;

/// Interleaved samples per frame handed to the output device.
pub const FRAME_SIZE: usize = 512;

const CHANNEL_MAX_BUFFER: usize = 256;

pub type AudioFrame = [f32; FRAME_SIZE];

pub use audio_device::{AudioOutputDeviceStream, OutputStream};
pub use error::{Error, GraphError, Result};
pub use graph::{AudioContext, ContextState, GraphBuilder, NodeId};
pub use instrument::{
    parse_control, Control, ControlPanel, Instrument, SynthController, DEFAULT_GAIN_DB,
    DEFAULT_SPEED_MS,
};
pub use midi::{list_midi_input_ports, MidiInputDeviceStream, MidiInputStream, RawMidiMessage};
pub use monitor::{
    format_bin, format_dec, format_hex, DisplayFormat, MessageTable, MidiMonitor, Screen,
    TerminalScreen, ACCESS_FAILED_NOTICE,
};
pub use param::{AudioParam, RampCurve};
pub use synthesizer::{
    dbtoa, harmonic_targets, master_gain, pick_fundamental, Synthesizer, FREQUENCY_TABLE,
    GAIN_RAMP, HARMONICS, MASTER_NORMALIZATION, RETUNE_RAMP,
};
pub use timer::PeriodicTask;
