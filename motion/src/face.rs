use crate::config::FaceTrackingConfig;
use tracing::trace;

/// Converts normalized gaze offsets into smoothed yaw/pitch targets.
///
/// The home pose is captured when tracking is enabled; targets are
/// the home pose plus the scaled offset, clamped to a safe envelope,
/// and relax back to home while no face is detected. Current angles
/// chase the target exponentially, and a write is only suggested once
/// accumulated motion since the last write clears a threshold, so the
/// bus is not flooded with sub-degree updates.
pub struct FaceTrackingController {
    cfg: FaceTrackingConfig,
    base_yaw: f64,
    base_pitch: f64,
    target_yaw: f64,
    target_pitch: f64,
    current_yaw: f64,
    current_pitch: f64,
    last_write: Option<(f64, f64)>,
}

impl FaceTrackingController {
    pub fn new(cfg: FaceTrackingConfig) -> Self {
        Self {
            cfg,
            base_yaw: 0.0,
            base_pitch: 0.0,
            target_yaw: 0.0,
            target_pitch: 0.0,
            current_yaw: 0.0,
            current_pitch: 0.0,
            last_write: None,
        }
    }

    /// Capture a new home pose. Called on every transition into face
    /// tracking.
    pub fn reset(&mut self, base_yaw: f64, base_pitch: f64) {
        self.base_yaw = base_yaw;
        self.base_pitch = base_pitch;
        self.target_yaw = base_yaw;
        self.target_pitch = base_pitch;
        self.current_yaw = base_yaw;
        self.current_pitch = base_pitch;
        self.last_write = None;
    }

    /// One tick of tracking. `gaze` is the normalized `(x, y)` offset
    /// of the face from frame center in `[-1, 1]`, or `None` when no
    /// face is visible. Returns `(yaw, pitch)` when the pose has
    /// moved enough to be worth writing to the bus.
    pub fn step(&mut self, gaze: Option<(f64, f64)>) -> Option<(f64, f64)> {
        match gaze {
            Some((x, y)) => {
                let x = if x.abs() < self.cfg.dead_zone { 0.0 } else { x };
                let y = if y.abs() < self.cfg.dead_zone { 0.0 } else { y };
                self.target_yaw = (self.base_yaw + x * self.cfg.scale).clamp(
                    self.base_yaw - self.cfg.max_swing,
                    self.base_yaw + self.cfg.max_swing,
                );
                // Camera y grows downward; pitch grows upward.
                self.target_pitch = (self.base_pitch - y * self.cfg.scale).clamp(
                    self.base_pitch - self.cfg.max_swing,
                    self.base_pitch + self.cfg.max_swing,
                );
            }
            None => {
                self.target_yaw = self.base_yaw;
                self.target_pitch = self.base_pitch;
            }
        }

        self.current_yaw += (self.target_yaw - self.current_yaw) * self.cfg.smoothing;
        self.current_pitch += (self.target_pitch - self.current_pitch) * self.cfg.smoothing;

        let (last_yaw, last_pitch) = self.last_write.unwrap_or((self.base_yaw, self.base_pitch));
        let moved = (self.current_yaw - last_yaw).abs() + (self.current_pitch - last_pitch).abs();
        if self.last_write.is_none() || moved >= self.cfg.min_motion {
            self.last_write = Some((self.current_yaw, self.current_pitch));
            trace!(
                yaw = self.current_yaw,
                pitch = self.current_pitch,
                "face tracking pose update"
            );
            Some((self.current_yaw, self.current_pitch))
        } else {
            None
        }
    }

    pub fn current(&self) -> (f64, f64) {
        (self.current_yaw, self.current_pitch)
    }
}
