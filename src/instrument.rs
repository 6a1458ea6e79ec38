use crate::{
    audio_device::{AudioOutputDeviceStream, OutputStream},
    synthesizer::{Synthesizer, FREQUENCY_TABLE},
    timer::PeriodicTask,
    AudioFrame, Error, Result,
};

use crossbeam_channel::{self as channel, select, Receiver};
use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};
use std::fmt;
use std::time::{Duration, Instant};

pub const DEFAULT_SPEED_MS: u64 = 125;
pub const DEFAULT_GAIN_DB: f32 = -12.0;

/// User input from the control surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Control {
    /// The start/stop button.
    Toggle,
    /// The update speed slider, in milliseconds between retunes.
    SetSpeed(u64),
    /// The master gain slider, in dBFS.
    SetGainDb(f32),
}

/// Reads one line of the text control surface.
///
/// An empty line, `t` or `toggle` presses the button; `speed <ms>` and `gain <db>` move the
/// sliders.
pub fn parse_control(line: &str) -> Result<Control> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or("toggle");
    let argument = words.next();
    let invalid = || Error::InvalidControl(line.trim().to_string());

    let control = match (command, argument) {
        ("t", None) | ("toggle", None) => Control::Toggle,
        ("speed", Some(ms)) => match ms.parse::<u64>() {
            Ok(ms) if ms > 0 => Control::SetSpeed(ms),
            _ => return Err(invalid()),
        },
        ("gain", Some(db)) => Control::SetGainDb(db.parse().map_err(|_| invalid())?),
        _ => return Err(invalid()),
    };
    if words.next().is_some() {
        return Err(invalid());
    }

    Ok(control)
}

/// What the control surface shows: the button label plus the two slider echoes.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlPanel {
    pub playing: bool,
    pub speed_ms: u64,
    pub gain_db: f32,
}

impl ControlPanel {
    pub fn button_label(&self) -> &'static str {
        if self.playing {
            "Stop"
        } else {
            "Start"
        }
    }

    pub fn speed_label(&self) -> String {
        format!("{} ms", self.speed_ms)
    }

    pub fn gain_label(&self) -> String {
        format!("{} dB", self.gain_db)
    }
}

impl fmt::Display for ControlPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]  speed: {}  gain: {}",
            self.button_label(),
            self.speed_label(),
            self.gain_label()
        )
    }
}

/// Owns everything the control thread touches: the synth, the retune timer and the output
/// transport.
pub struct SynthController<O: OutputStream> {
    synth: Synthesizer,
    timer: PeriodicTask,
    panel: ControlPanel,
    output: O,
    rng: StdRng,
}

impl<O: OutputStream> SynthController<O> {
    pub fn new(
        mut synth: Synthesizer,
        output: O,
        speed_ms: u64,
        gain_db: f32,
        now: Instant,
        rng: StdRng,
    ) -> Self {
        synth.set_gain_db(gain_db);
        let panel = ControlPanel {
            playing: synth.is_running(),
            speed_ms,
            gain_db,
        };

        SynthController {
            synth,
            timer: PeriodicTask::new(Duration::from_millis(speed_ms), now),
            panel,
            output,
            rng,
        }
    }

    pub fn synth(&self) -> &Synthesizer {
        &self.synth
    }

    pub fn panel(&self) -> &ControlPanel {
        &self.panel
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn next_retune(&self) -> Instant {
        self.timer.next_due()
    }

    pub fn retune_period(&self) -> Duration {
        self.timer.period()
    }

    pub fn handle_control(&mut self, control: Control, now: Instant) -> Result<()> {
        match control {
            Control::Toggle => {
                if self.synth.is_running() {
                    self.output.pause()?;
                    self.synth.stop();
                } else {
                    self.synth.start();
                    self.output.play()?;
                }
                self.panel.playing = self.synth.is_running();
            }
            Control::SetSpeed(ms) => {
                // Ramps already scheduled by the old timer are left alone.
                self.panel.speed_ms = ms;
                self.timer.reschedule(Duration::from_millis(ms), now);
            }
            Control::SetGainDb(db) => {
                self.panel.gain_db = db;
                self.synth.set_gain_db(db);
            }
        }

        Ok(())
    }

    /// Retunes if the timer is due. Returns whether it fired.
    pub fn on_timer(&mut self, now: Instant) -> bool {
        if !self.timer.poll(now) {
            return false;
        }
        self.synth.retune_random(&mut self.rng);

        true
    }

    pub fn render(&mut self, num_channels: usize) -> AudioFrame {
        self.synth.sample(num_channels)
    }
}

/// Runs the additive synth on the default output device, driven by a stream of controls.
pub struct Instrument {
    canceller: Receiver<()>,
    speed_ms: u64,
    gain_db: f32,
}

impl Instrument {
    pub fn new(canceller: Receiver<()>, speed_ms: u64, gain_db: f32) -> Self {
        Instrument {
            canceller,
            speed_ms,
            gain_db,
        }
    }

    pub fn play(&self, controls: &Receiver<Control>) -> Result<()> {
        let audio_output_stream = AudioOutputDeviceStream::connect_default()?;
        let num_channels = audio_output_stream.num_channels();
        let buffer_request_rx = audio_output_stream.get_buffer_request_rx().clone();
        let synth = Synthesizer::new(
            audio_output_stream.sample_hz(),
            FREQUENCY_TABLE[0],
            self.gain_db,
        )?;
        let mut controller = SynthController::new(
            synth,
            audio_output_stream,
            self.speed_ms,
            self.gain_db,
            Instant::now(),
            StdRng::from_entropy(),
        );

        // Get ahead of the CPAL buffering.
        // This represents an additional fixed latency of:
        //     5 buffers * 256 samples per channel * (1 / 44100) seconds = 0.03 seconds
        const BUFFERS_AHEAD: u32 = 5;
        for _ in 0..BUFFERS_AHEAD {
            let frame = controller.render(num_channels);
            controller.output().write_frame(frame)?;
        }

        println!("{}", controller.panel());
        loop {
            let retune_deadline = channel::at(controller.next_retune());
            select! {
                recv(controls) -> item => match item {
                    Ok(control) => {
                        controller.handle_control(control, Instant::now())?;
                        println!("{}", controller.panel());
                    }
                    Err(_) => {
                        info!("Control input closed");
                        break;
                    }
                },
                recv(retune_deadline) -> _ => {
                    controller.on_timer(Instant::now());
                },
                recv(buffer_request_rx) -> item => {
                    if item.is_err() {
                        break;
                    }
                    let frame = controller.render(num_channels);
                    controller.output().write_frame(frame)?;
                },
                recv(self.canceller) -> _ => {
                    debug!("Interrupted instrument");
                    break;
                }
            }
        }

        // Tear down.
        controller.output().pause()
    }
}
