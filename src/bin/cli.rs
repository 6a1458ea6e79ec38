use partials::{
    list_midi_input_ports, parse_control, Control, DisplayFormat, Instrument,
    MidiInputDeviceStream, MidiMonitor, TerminalScreen, DEFAULT_GAIN_DB, DEFAULT_SPEED_MS,
};

use crossbeam_channel as channel;
use log::{error, warn};
use std::io::{self, BufRead};
use std::process;
use std::thread;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "partials")]
enum Opt {
    /// List MIDI input ports.
    List,
    /// Show every incoming MIDI message as binary, decimal and hex.
    Monitor {
        /// Render the table as HTML markup.
        #[structopt(long = "html")]
        html: bool,
    },
    /// Play the additive synth. Commands on stdin: <enter> or `t` toggles playback,
    /// `speed <ms>` sets the retune interval, `gain <db>` sets the master gain.
    Synth {
        /// Milliseconds between retunes [default: 125]
        #[structopt(short = "s", long = "speed")]
        speed_ms: Option<u64>,

        /// Master gain in dBFS [default: -12]
        #[structopt(short = "g", long = "gain", allow_hyphen_values = true)]
        gain_db: Option<f32>,
    },
}

fn main() {
    env_logger::init();

    let opt = Opt::from_args();

    // Set SIGINT handler.
    let (exit_tx, exit_rx) = channel::bounded(1);
    // Keeps the channel open if the handler can't be installed.
    let _exit_tx = exit_tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = exit_tx.try_send(());
    }) {
        warn!("Error setting Ctrl-C handler: {}", e);
    }

    let result = match opt {
        Opt::List => list_midi_input_ports().map(|names| {
            println!("--- Available MIDI input ports ---");
            for (i, name) in names.iter().enumerate() {
                println!("{}: {}", i, name);
            }
        }),
        Opt::Monitor { html } => {
            let format = if html {
                DisplayFormat::Html
            } else {
                DisplayFormat::Text
            };
            let mut screen = TerminalScreen::new(io::stdout());
            match MidiInputDeviceStream::connect_all() {
                Ok(midi_input) => MidiMonitor::new(exit_rx, format).run(midi_input, &mut screen),
                Err(e) => {
                    error!("{}", e);
                    MidiMonitor::show_access_failed(&mut screen)
                }
            }
        }
        Opt::Synth { speed_ms, gain_db } => {
            let speed_ms = speed_ms.unwrap_or(DEFAULT_SPEED_MS);
            let gain_db = gain_db.unwrap_or(DEFAULT_GAIN_DB);
            if speed_ms == 0 {
                eprintln!("--speed must be at least 1 ms");
                process::exit(2);
            }
            let controls = spawn_control_reader();
            Instrument::new(exit_rx, speed_ms, gain_db).play(&controls)
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        process::exit(1);
    }
}

/// Forwards parsed stdin lines to the instrument. The channel closes with stdin.
fn spawn_control_reader() -> channel::Receiver<Control> {
    let (control_tx, control_rx) = channel::unbounded();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read control input: {}", e);
                    break;
                }
            };
            match parse_control(&line) {
                Ok(control) => {
                    if control_tx.send(control).is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("{}", e),
            }
        }
    });

    control_rx
}
