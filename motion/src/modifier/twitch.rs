use super::Modifier;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::time::Duration;

struct Pulse {
    started: f64,
    peaks: HashMap<String, f64>,
}

/// Random micro-movements on a random-interval schedule.
///
/// When the interval expires a fixed-duration pulse begins; each
/// queried joint gets its own random peak, shaped by `sin(pi *
/// progress)` so the pulse eases in and out. When the pulse ends the
/// next interval is drawn.
pub struct TwitchModifier {
    min_interval: f64,
    max_interval: f64,
    amplitude: f64,
    pulse_duration: f64,
    rng: StdRng,
    next_at: Option<f64>,
    pulse: Option<Pulse>,
}

impl TwitchModifier {
    pub fn new(min_interval: f64, max_interval: f64, amplitude: f64, pulse_duration: f64) -> Self {
        Self {
            min_interval,
            max_interval,
            amplitude,
            pulse_duration: pulse_duration.max(f64::EPSILON),
            rng: StdRng::from_entropy(),
            next_at: None,
            pulse: None,
        }
    }

    /// Deterministic scheduling and peaks for tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    fn sample_interval(&mut self) -> f64 {
        if self.max_interval <= self.min_interval {
            self.min_interval
        } else {
            self.rng.gen_range(self.min_interval..self.max_interval)
        }
    }

    fn peak_for(&mut self, joint: &str) -> f64 {
        let amplitude = self.amplitude;
        let rng = &mut self.rng;
        let Some(pulse) = self.pulse.as_mut() else {
            return 0.0;
        };
        *pulse
            .peaks
            .entry(joint.to_owned())
            .or_insert_with(|| rng.gen_range(-amplitude..=amplitude))
    }
}

impl Modifier for TwitchModifier {
    fn offset(&mut self, joint: &str, elapsed: Duration) -> f64 {
        let t = elapsed.as_secs_f64();
        if self.next_at.is_none() {
            let gap = self.sample_interval();
            self.next_at = Some(gap);
        }
        if self.pulse.is_none() {
            if t >= self.next_at.unwrap_or(f64::MAX) {
                self.pulse = Some(Pulse {
                    started: t,
                    peaks: HashMap::new(),
                });
            } else {
                return 0.0;
            }
        }
        let started = self.pulse.as_ref().map(|p| p.started).unwrap_or(t);
        let progress = (t - started) / self.pulse_duration;
        if progress >= 1.0 {
            self.pulse = None;
            let gap = self.sample_interval();
            self.next_at = Some(t + gap);
            return 0.0;
        }
        self.peak_for(joint) * (PI * progress.max(0.0)).sin()
    }

    fn reset(&mut self) {
        self.next_at = None;
        self.pulse = None;
    }
}
