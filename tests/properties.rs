use approx::assert_relative_eq;
use crossbeam_channel as channel;
use partials::*;
use rand::{rngs::StdRng, SeedableRng};
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct NullOutput;

impl OutputStream for NullOutput {
    fn play(&self) -> Result<()> {
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        Ok(())
    }
}

fn controller(now: Instant) -> SynthController<NullOutput> {
    let synth = Synthesizer::new(48_000.0, FREQUENCY_TABLE[0], 0.0).unwrap();
    SynthController::new(
        synth,
        NullOutput,
        DEFAULT_SPEED_MS,
        0.0,
        now,
        StdRng::seed_from_u64(42),
    )
}

#[test]
fn note_on_renders_in_three_bases() {
    let message = RawMidiMessage::new("keys", 12_345, &[0x90, 0x3C, 0x40]);
    let table = MessageTable::from_message(&message);

    assert_eq!(table.binary, "10010000 00111100 01000000");
    assert_eq!(table.decimal, "144 60 64");
    assert_eq!(table.hex, "90 3C 40");

    let html = table.to_html();
    assert!(html.starts_with("<table>"));
    assert!(html.contains("<td>12.345</td>"));
    assert!(html.contains("<td>10010000 00111100 01000000</td><td>144 60 64</td><td>90 3C 40</td>"));
}

struct ScriptedInput {
    message_rx: channel::Receiver<RawMidiMessage>,
}

impl MidiInputStream for ScriptedInput {
    fn get_message_rx(&self) -> &channel::Receiver<RawMidiMessage> {
        &self.message_rx
    }

    fn close(self) {}
}

#[derive(Default)]
struct RecordingScreen {
    shown: Vec<String>,
}

impl Screen for RecordingScreen {
    fn replace(&mut self, content: &str) -> Result<()> {
        self.shown.push(content.to_string());
        Ok(())
    }
}

#[test]
fn monitor_replaces_display_per_message() {
    let (message_tx, message_rx) = channel::unbounded();
    message_tx.send(RawMidiMessage::new("keys", 0, &[0x90, 0x3C, 0x40])).unwrap();
    message_tx.send(RawMidiMessage::new("keys", 1_000, &[0x80, 0x3C, 0x00])).unwrap();
    drop(message_tx);

    let (_cancel_tx, cancel_rx) = channel::bounded(1);
    let mut screen = RecordingScreen::default();
    MidiMonitor::new(cancel_rx, DisplayFormat::Html)
        .run(ScriptedInput { message_rx }, &mut screen)
        .unwrap();

    let shown = screen.shown;
    assert_eq!(shown.len(), 2);
    assert!(shown[1].contains("<td>80 3C 00</td>"));
}

#[test]
fn access_failure_shows_static_notice() {
    let mut screen = RecordingScreen::default();
    MidiMonitor::show_access_failed(&mut screen).unwrap();
    assert_eq!(screen.shown, vec![ACCESS_FAILED_NOTICE.to_string()]);
}

#[test]
fn duplicated_fundamental_is_drawn_twice_as_often() {
    let mut rng = StdRng::seed_from_u64(1234);
    let draws = 120_000;
    let mut counts: HashMap<u32, u32> = HashMap::new();
    for _ in 0..draws {
        *counts.entry(pick_fundamental(&mut rng).to_bits()).or_default() += 1;
    }

    assert_eq!(counts.len(), 11);
    let doubled = counts[&152.61_f32.to_bits()] as f64;
    let singles: Vec<f64> = counts
        .iter()
        .filter(|(bits, _)| **bits != 152.61_f32.to_bits())
        .map(|(_, n)| *n as f64)
        .collect();
    let mean_single = singles.iter().sum::<f64>() / singles.len() as f64;

    let ratio = doubled / mean_single;
    assert!(ratio > 1.8 && ratio < 2.2, "ratio = {}", ratio);
}

#[test]
fn harmonic_targets_are_odd_multiples() {
    for f in FREQUENCY_TABLE.iter().chain([1.0, 55.5, 1000.0].iter()) {
        assert_eq!(harmonic_targets(*f), [*f, 3.0 * f, 5.0 * f, 7.0 * f, 9.0 * f]);
    }
}

#[test]
fn gain_conversion() {
    assert_eq!(dbtoa(0.0), 1.0);
    assert_relative_eq!(dbtoa(-20.0), 0.1, epsilon = 1e-7);
    assert_relative_eq!(master_gain(0.0), 0.636_619_8, epsilon = 1e-6);
    assert_relative_eq!(master_gain(0.0), MASTER_NORMALIZATION);
}

#[test]
fn transport_toggles_without_touching_pitch() {
    let now = Instant::now();
    let mut c = controller(now);
    assert_eq!(c.synth().context().state(), ContextState::Suspended);
    let before = c.synth().oscillator_frequencies();

    c.handle_control(Control::Toggle, now).unwrap();
    c.handle_control(Control::Toggle, now).unwrap();
    c.handle_control(Control::Toggle, now).unwrap();

    assert_eq!(c.synth().context().state(), ContextState::Running);
    assert_eq!(c.synth().oscillator_frequencies(), before);
}

#[test]
fn speed_change_restarts_timer_at_new_period() {
    let start = Instant::now();
    let mut c = controller(start);

    // One retune at the default period, then the slider moves.
    assert!(c.on_timer(start + Duration::from_millis(125)));
    let change = start + Duration::from_millis(200);
    c.handle_control(Control::SetSpeed(500), change).unwrap();
    assert_eq!(c.retune_period(), Duration::from_millis(500));

    // The old 250 ms deadline is gone.
    assert!(!c.on_timer(start + Duration::from_millis(250)));
    assert!(!c.on_timer(change + Duration::from_millis(499)));

    let mut fired = Vec::new();
    let mut t = change;
    while t < change + Duration::from_millis(2_000) {
        t += Duration::from_millis(5);
        if c.on_timer(t) {
            fired.push(t);
        }
    }
    assert_eq!(fired.len(), 4);
    for pair in fired.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::from_millis(500));
    }
}

#[test]
fn retune_ramps_all_partials_in_twenty_ms() {
    let now = Instant::now();
    let mut c = controller(now);
    c.handle_control(Control::Toggle, now).unwrap();
    c.on_timer(now + Duration::from_millis(DEFAULT_SPEED_MS));

    let f = c.synth().fundamental();
    assert_eq!(c.synth().oscillator_frequencies(), harmonic_targets(f));

    // 20 ms at 48 kHz is under four frames of 256 stereo samples.
    for _ in 0..4 {
        c.render(2);
    }
    assert!(c.synth().context().current_time() >= RETUNE_RAMP);
}
