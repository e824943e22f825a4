use super::Modifier;
use std::f64::consts::TAU;
use std::time::Duration;

/// Slow sinusoidal rise and fall, the lamp's resting "breath".
pub struct BreathingModifier {
    amplitude: f64,
    frequency: f64,
    phase_offset: f64,
}

impl BreathingModifier {
    pub fn new(amplitude: f64, frequency: f64) -> Self {
        Self {
            amplitude,
            frequency,
            phase_offset: 0.0,
        }
    }

    pub fn with_phase_offset(mut self, phase_offset: f64) -> Self {
        self.phase_offset = phase_offset;
        self
    }
}

impl Modifier for BreathingModifier {
    fn offset(&mut self, _joint: &str, elapsed: Duration) -> f64 {
        let t = elapsed.as_secs_f64();
        self.amplitude * (TAU * self.frequency * t + self.phase_offset).sin()
    }
}
