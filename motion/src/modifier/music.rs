use super::Modifier;
use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

/// External tempo/energy signal the music modifier and dance mode
/// consume. Implementations typically proxy a player integration
/// that lives outside this crate.
pub trait MusicSource: Send + Sync {
    fn bpm(&self) -> f32;
    fn is_playing(&self) -> bool;
    fn energy(&self) -> f32;
}

/// Beat-locked bobbing.
///
/// The source is polled on a coarse interval rather than every tick
/// to bound call overhead. An envelope eases toward 1.0 while music
/// plays and back toward 0.0 when it stops, energy below the
/// threshold gates output to zero, and each joint's phase is offset
/// by its position in the joint order, producing a traveling wave
/// down the lamp. A second harmonic adds the off-beat "groove".
pub struct MusicModifier {
    source: Arc<dyn MusicSource>,
    joint_order: Vec<String>,
    amplitude: f64,
    beat_divisor: f64,
    energy_threshold: f64,
    groove: f64,
    spread: f64,
    envelope_rate: f64,
    poll_interval: Duration,

    envelope: f64,
    phase: f64,
    bpm: f64,
    playing: bool,
    energy: f64,
    last_elapsed: Option<Duration>,
    last_poll: Option<Duration>,
}

impl MusicModifier {
    pub fn new(source: Arc<dyn MusicSource>, joint_order: Vec<String>) -> Self {
        Self {
            source,
            joint_order,
            amplitude: 6.0,
            beat_divisor: 2.0,
            energy_threshold: 0.15,
            groove: 0.35,
            spread: 0.8,
            envelope_rate: 3.0,
            poll_interval: Duration::from_millis(500),
            envelope: 0.0,
            phase: 0.0,
            bpm: 0.0,
            playing: false,
            energy: 0.0,
            last_elapsed: None,
            last_poll: None,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_energy_threshold(mut self, threshold: f64) -> Self {
        self.energy_threshold = threshold;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Advance phase/envelope once per distinct `elapsed` value; the
    /// stack queries every joint with the same elapsed within a tick.
    fn advance(&mut self, elapsed: Duration) {
        if self.last_elapsed == Some(elapsed) {
            return;
        }
        let dt = elapsed
            .saturating_sub(self.last_elapsed.unwrap_or(elapsed))
            .as_secs_f64();
        self.last_elapsed = Some(elapsed);

        let poll_due = match self.last_poll {
            None => true,
            Some(at) => elapsed.saturating_sub(at) >= self.poll_interval,
        };
        if poll_due {
            self.bpm = f64::from(self.source.bpm()).max(0.0);
            self.playing = self.source.is_playing();
            self.energy = f64::from(self.source.energy()).clamp(0.0, 1.0);
            self.last_poll = Some(elapsed);
        }

        let target = if self.playing { 1.0 } else { 0.0 };
        self.envelope += (target - self.envelope) * (self.envelope_rate * dt).min(1.0);
        self.phase += dt * (self.bpm / 60.0) / self.beat_divisor * TAU;
    }

    fn gate(&self) -> f64 {
        if self.energy < self.energy_threshold {
            return 0.0;
        }
        let span = (1.0 - self.energy_threshold).max(f64::EPSILON);
        ((self.energy - self.energy_threshold) / span).min(1.0)
    }
}

impl Modifier for MusicModifier {
    fn offset(&mut self, joint: &str, elapsed: Duration) -> f64 {
        self.advance(elapsed);
        let gate = self.gate();
        if gate == 0.0 || self.envelope < 1e-3 {
            return 0.0;
        }
        let index = self.joint_order.iter().position(|j| j == joint).unwrap_or(0);
        let phase = self.phase + index as f64 * self.spread;
        (phase.sin() + self.groove * (2.0 * phase).sin()) * self.amplitude * gate * self.envelope
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
        self.phase = 0.0;
        self.last_elapsed = None;
        self.last_poll = None;
    }
}
