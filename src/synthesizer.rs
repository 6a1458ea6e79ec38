use crate::{
    graph::{AudioContext, ContextState, GraphBuilder, NodeId},
    AudioFrame, Result,
};

use log::{debug, info};
use rand::{seq::SliceRandom, Rng};
use std::f32::consts::PI;

/// Odd harmonic numbers summed into the output. 1/n² weighting approximates a triangle wave.
pub const HARMONICS: [u32; 5] = [1, 3, 5, 7, 9];

/// Fundamentals to pick from on each retune. 152.61 is listed twice and so comes up twice as
/// often as any other entry.
pub const FREQUENCY_TABLE: [f32; 12] = [
    130.81, 152.61, 152.61, 174.41, 196.22, 228.92, 261.63, 305.23, 348.83, 392.44, 457.85,
    523.25,
];

/// Keeps the summed odd-harmonic series within full scale.
pub const MASTER_NORMALIZATION: f32 = 2.0 / PI;

/// Seconds.
pub const RETUNE_RAMP: f64 = 0.020;
pub const GAIN_RAMP: f64 = 0.010;

pub fn dbtoa(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Master stage gain for a gain slider value in dBFS.
pub fn master_gain(db: f32) -> f32 {
    dbtoa(db) * MASTER_NORMALIZATION
}

pub fn harmonic_targets(fundamental: f32) -> [f32; 5] {
    let mut targets = [0.0; 5];
    for (target, n) in targets.iter_mut().zip(HARMONICS.iter()) {
        *target = fundamental * *n as f32;
    }

    targets
}

pub fn pick_fundamental<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    *FREQUENCY_TABLE
        .choose(rng)
        .unwrap_or(&FREQUENCY_TABLE[0])
}

/// Five oscillator -> gain pairs summed into a master gain. Built once; only parameters change
/// afterwards.
pub struct Synthesizer {
    context: AudioContext,
    oscillators: Vec<NodeId>,
    master: NodeId,
    fundamental: f32,
}

impl Synthesizer {
    pub fn new(sample_hz: f32, fundamental: f32, gain_db: f32) -> Result<Self> {
        let mut builder = GraphBuilder::new(sample_hz);
        let master = builder.add_gain(master_gain(gain_db));
        builder.connect_to_output(master)?;

        let targets = harmonic_targets(fundamental);
        let mut oscillators = Vec::with_capacity(HARMONICS.len());
        for (n, hz) in HARMONICS.iter().zip(targets.iter()) {
            let osc = builder.add_oscillator(*hz);
            let partial = builder.add_gain(1.0 / (n * n) as f32);
            builder.connect(osc, partial)?;
            builder.connect(partial, master)?;
            oscillators.push(osc);
        }

        Ok(Synthesizer {
            context: builder.build()?,
            oscillators,
            master,
            fundamental,
        })
    }

    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    pub fn fundamental(&self) -> f32 {
        self.fundamental
    }

    pub fn oscillator_frequencies(&self) -> [f32; 5] {
        let mut hz = [0.0; 5];
        for (f, osc) in hz.iter_mut().zip(self.oscillators.iter()) {
            *f = self.context.param(*osc).value();
        }

        hz
    }

    pub fn master_gain(&self) -> f32 {
        self.context.param(self.master).value()
    }

    /// Glides every partial to the harmonic set of `fundamental`.
    pub fn retune(&mut self, fundamental: f32) {
        let now = self.context.current_time();
        debug!("Retuning to {} Hz at t = {:.3}", fundamental, now);
        self.fundamental = fundamental;
        for (osc, hz) in self.oscillators.iter().zip(harmonic_targets(fundamental).iter()) {
            self.context
                .param_mut(*osc)
                .exponential_ramp_to(*hz, now, RETUNE_RAMP);
        }
    }

    pub fn retune_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let fundamental = pick_fundamental(rng);
        self.retune(fundamental);
    }

    pub fn set_gain_db(&mut self, db: f32) {
        let now = self.context.current_time();
        let target = master_gain(db);
        debug!("Master gain {} dB -> {}", db, target);
        self.context
            .param_mut(self.master)
            .linear_ramp_to(target, now, GAIN_RAMP);
    }

    pub fn is_running(&self) -> bool {
        self.context.state() == ContextState::Running
    }

    pub fn start(&mut self) {
        self.context.resume();
        info!("Synth started");
    }

    pub fn stop(&mut self) {
        self.context.suspend();
        info!("Synth stopped");
    }

    /// Returns whether the synth is running afterwards.
    pub fn toggle(&mut self) -> bool {
        if self.is_running() {
            self.stop();
        } else {
            self.start();
        }

        self.is_running()
    }

    pub fn sample(&mut self, num_channels: usize) -> AudioFrame {
        self.context.render_frame(num_channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn partials_are_odd_harmonics() {
        let synth = Synthesizer::new(48_000.0, 100.0, 0.0).unwrap();
        assert_eq!(synth.oscillator_frequencies(), [100.0, 300.0, 500.0, 700.0, 900.0]);
        // 5 oscillators, 5 partial gains, 1 master.
        assert_eq!(synth.context().num_nodes(), 11);
    }

    #[test]
    fn starts_suspended() {
        let mut synth = Synthesizer::new(48_000.0, 100.0, 0.0).unwrap();
        assert!(!synth.is_running());
        assert!(synth.sample(2).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn output_stays_within_full_scale() {
        let mut synth = Synthesizer::new(48_000.0, 130.81, 0.0).unwrap();
        synth.start();
        for _ in 0..50 {
            let frame = synth.sample(1);
            assert!(frame.iter().all(|s| s.abs() <= 1.0));
        }
    }

    #[test]
    fn gain_ramps_linearly_over_ten_ms() {
        let mut synth = Synthesizer::new(1000.0, 100.0, 0.0).unwrap();
        synth.start();
        synth.set_gain_db(-20.0);
        assert_relative_eq!(synth.master_gain(), 0.1 * MASTER_NORMALIZATION, epsilon = 1e-6);

        let master = synth.master;
        let param = synth.context().param(master);
        let halfway = param.value_at(0.005);
        assert_relative_eq!(
            halfway,
            (MASTER_NORMALIZATION + 0.1 * MASTER_NORMALIZATION) / 2.0,
            epsilon = 1e-5
        );
    }

    #[test]
    fn retune_glides_from_current_pitch() {
        let mut synth = Synthesizer::new(1000.0, 100.0, 0.0).unwrap();
        synth.retune(200.0);
        let osc = synth.oscillators[0];
        let param = synth.context().param(osc);
        assert_relative_eq!(param.value_at(0.0), 100.0);
        assert_relative_eq!(param.value_at(0.010), 141.421_36, epsilon = 1e-3);
        assert_relative_eq!(param.value_at(RETUNE_RAMP), 200.0);
    }
}
