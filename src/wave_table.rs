use once_cell::sync::Lazy;
use std::f32;

const WAVE_TABLE_SIZE: usize = 1 << 16;

fn table_sample_conversion_factor(sample_hz: f32) -> f32 {
    WAVE_TABLE_SIZE as f32 / sample_hz
}

// Wave functions must be defined on the domain [0.0, 1.0], preferably with a codomain of [-1.0,
// 1.0].

fn init_wave<F>(wave_fn: F) -> Vec<f32>
where
    F: Fn(f32) -> f32,
{
    (0..WAVE_TABLE_SIZE)
        .map(|i| wave_fn(i as f32 / WAVE_TABLE_SIZE as f32))
        .collect()
}

fn sine_wave(t: f32) -> f32 {
    (2.0 * f32::consts::PI * t).sin()
}

static SINE_WAVE: Lazy<Vec<f32>> = Lazy::new(|| init_wave(sine_wave));

pub fn get_sine_wave() -> &'static [f32] {
    &SINE_WAVE
}

/// Phase accumulator over a wave table. The step may change between any two samples without
/// resetting the phase.
#[derive(Clone, Debug)]
pub struct WaveTableIndex {
    index: f32,
    sample_hz: f32,
}

impl WaveTableIndex {
    pub fn new(sample_hz: f32) -> Self {
        WaveTableIndex {
            index: 0.0,
            sample_hz,
        }
    }

    pub fn sample_table(&mut self, table: &[f32], hz: f32) -> f32 {
        let sample = table[self.index as usize % table.len()];
        let indices_per_sample = hz * table_sample_conversion_factor(self.sample_hz);
        self.index = (self.index + indices_per_sample).rem_euclid(table.len() as f32);

        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_table_starts_at_zero_and_peaks_at_quarter() {
        let table = get_sine_wave();
        assert_eq!(table.len(), WAVE_TABLE_SIZE);
        assert!(table[0].abs() < 1e-6);
        assert!((table[WAVE_TABLE_SIZE / 4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn index_advances_by_frequency() {
        let table = get_sine_wave();
        // A quarter cycle per sample.
        let mut index = WaveTableIndex::new(4.0);
        let samples: Vec<f32> = (0..4).map(|_| index.sample_table(table, 1.0)).collect();
        assert!(samples[0].abs() < 1e-6);
        assert!((samples[1] - 1.0).abs() < 1e-6);
        assert!(samples[2].abs() < 1e-3);
        assert!((samples[3] + 1.0).abs() < 1e-6);
    }
}
