use super::Modifier;
use std::f64::consts::TAU;
use std::time::Duration;

/// Two superimposed sine waves at independent amplitude/frequency
/// pairs. The incommensurate frequencies keep the drift from looking
/// periodic.
pub struct SwayModifier {
    primary: (f64, f64),
    secondary: (f64, f64),
}

impl SwayModifier {
    /// Each wave is an `(amplitude_degrees, frequency_hz)` pair.
    pub fn new(primary: (f64, f64), secondary: (f64, f64)) -> Self {
        Self { primary, secondary }
    }
}

impl Modifier for SwayModifier {
    fn offset(&mut self, _joint: &str, elapsed: Duration) -> f64 {
        let t = elapsed.as_secs_f64();
        let (a1, f1) = self.primary;
        let (a2, f2) = self.secondary;
        a1 * (TAU * f1 * t).sin() + a2 * (TAU * f2 * t).sin()
    }
}
