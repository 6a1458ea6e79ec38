use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MIDI access failed: {0}")]
    MidiAccess(String),

    #[error("MIDI port error: {0}")]
    MidiPort(String),

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("Invalid signal graph: {0}")]
    Graph(#[from] GraphError),

    #[error("Invalid control command: {0}")]
    InvalidControl(String),
}

/// Construction-time problems with a signal graph's topology.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    UnknownNode(usize),

    #[error("node {0} is an oscillator and has no inputs")]
    OscillatorInput(usize),

    #[error("graph contains a cycle")]
    Cycle,
}

impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::MidiAccess(e.to_string())
    }
}

impl From<midir::PortInfoError> for Error {
    fn from(e: midir::PortInfoError) -> Self {
        Error::MidiPort(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::MidiAccess(e.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for Error {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        Error::AudioDevice(e.to_string())
    }
}

impl From<cpal::BuildStreamError> for Error {
    fn from(e: cpal::BuildStreamError) -> Self {
        Error::AudioDevice(e.to_string())
    }
}

impl From<cpal::PlayStreamError> for Error {
    fn from(e: cpal::PlayStreamError) -> Self {
        Error::AudioDevice(e.to_string())
    }
}

impl From<cpal::PauseStreamError> for Error {
    fn from(e: cpal::PauseStreamError) -> Self {
        Error::AudioDevice(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
