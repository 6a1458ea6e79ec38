//! Scalar node parameters with click-free automation.
//!
//! Times are in seconds on the owning context's clock.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RampCurve {
    Linear,
    Exponential,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Ramp {
    curve: RampCurve,
    start_value: f32,
    start_time: f64,
    target: f32,
    end_time: f64,
}

impl Ramp {
    fn value_at(&self, time: f64) -> f32 {
        if time <= self.start_time {
            return self.start_value;
        }
        if time >= self.end_time {
            return self.target;
        }

        let t = ((time - self.start_time) / (self.end_time - self.start_time)) as f32;
        match self.curve {
            RampCurve::Linear => self.start_value + (self.target - self.start_value) * t,
            RampCurve::Exponential => {
                // Only defined between two nonzero values of the same sign.
                if self.start_value == 0.0 || self.start_value * self.target <= 0.0 {
                    self.start_value
                } else {
                    self.start_value * (self.target / self.start_value).powf(t)
                }
            }
        }
    }
}

/// A parameter that can be set outright or ramped toward a target.
///
/// At most one ramp is pending at a time. Scheduling a new one replaces it, starting from
/// wherever the old ramp had got to.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioParam {
    value: f32,
    ramp: Option<Ramp>,
}

impl AudioParam {
    pub fn new(value: f32) -> Self {
        AudioParam { value, ramp: None }
    }

    /// The value this parameter is heading toward (or sitting at).
    pub fn value(&self) -> f32 {
        self.ramp.map_or(self.value, |r| r.target)
    }

    pub fn set_value(&mut self, value: f32) {
        self.value = value;
        self.ramp = None;
    }

    pub fn linear_ramp_to(&mut self, target: f32, now: f64, duration: f64) {
        self.schedule(RampCurve::Linear, target, now, duration);
    }

    pub fn exponential_ramp_to(&mut self, target: f32, now: f64, duration: f64) {
        self.schedule(RampCurve::Exponential, target, now, duration);
    }

    pub fn is_ramping_at(&self, time: f64) -> bool {
        self.ramp.map_or(false, |r| time < r.end_time)
    }

    pub fn value_at(&self, time: f64) -> f32 {
        match &self.ramp {
            Some(ramp) => ramp.value_at(time),
            None => self.value,
        }
    }

    fn schedule(&mut self, curve: RampCurve, target: f32, now: f64, duration: f64) {
        let start_value = self.value_at(now);
        self.value = start_value;
        self.ramp = Some(Ramp {
            curve,
            start_value,
            start_time: now,
            target,
            end_time: now + duration.max(0.0),
        });
    }
}
