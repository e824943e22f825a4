use crate::error::MotionError;
use serde::{Deserialize, Serialize};

/// Tuning for the animation engine. Validated once at composition
/// time; nothing here changes at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tick rate of the engine task.
    pub fps: f64,
    /// Seconds spent blending from the current pose into a new
    /// recording's first frame.
    pub interp_duration: f64,
    /// Name of the recording looped when nothing else is playing.
    pub idle_recording: String,
    pub face: FaceTrackingConfig,
    pub dance: DanceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            interp_duration: 1.0,
            idle_recording: "idle".into(),
            face: FaceTrackingConfig::default(),
            dance: DanceConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), MotionError> {
        if !(self.fps > 0.0 && self.fps.is_finite()) {
            return Err(MotionError::InvalidConfig(format!("fps = {}", self.fps)));
        }
        if !(self.interp_duration >= 0.0 && self.interp_duration.is_finite()) {
            return Err(MotionError::InvalidConfig(format!(
                "interp_duration = {}",
                self.interp_duration
            )));
        }
        if self.idle_recording.is_empty() {
            return Err(MotionError::InvalidConfig("empty idle recording name".into()));
        }
        self.face.validate()?;
        self.dance.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceTrackingConfig {
    /// Joint driven by horizontal gaze offsets.
    pub yaw_joint: String,
    /// Joint driven by vertical gaze offsets.
    pub pitch_joint: String,
    /// Degrees of joint travel per unit of normalized gaze offset.
    pub scale: f64,
    /// Offsets below this magnitude are treated as zero.
    pub dead_zone: f64,
    /// Exponential smoothing factor in (0, 1].
    pub smoothing: f64,
    /// Safe envelope around the captured home pose, degrees.
    pub max_swing: f64,
    /// Minimum accumulated motion (degrees, yaw + pitch) before a
    /// bus write is issued.
    pub min_motion: f64,
}

impl Default for FaceTrackingConfig {
    fn default() -> Self {
        Self {
            yaw_joint: "base_yaw".into(),
            pitch_joint: "head_pitch".into(),
            scale: 25.0,
            dead_zone: 0.05,
            smoothing: 0.15,
            max_swing: 40.0,
            min_motion: 0.2,
        }
    }
}

impl FaceTrackingConfig {
    fn validate(&self) -> Result<(), MotionError> {
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(MotionError::InvalidConfig(format!(
                "face smoothing = {}",
                self.smoothing
            )));
        }
        if self.max_swing <= 0.0 {
            return Err(MotionError::InvalidConfig(format!(
                "face max_swing = {}",
                self.max_swing
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DanceConfig {
    /// Music energy below this never chains dance animations.
    pub dance_threshold: f32,
    /// Energy at or above this selects from the excited pool.
    pub excited_threshold: f32,
    pub groove_pool: Vec<String>,
    pub excited_pool: Vec<String>,
}

impl Default for DanceConfig {
    fn default() -> Self {
        Self {
            dance_threshold: 0.35,
            excited_threshold: 0.7,
            groove_pool: vec!["dancing1".into(), "dancing2".into(), "head_bob".into()],
            excited_pool: vec!["dancing3".into(), "shake".into()],
        }
    }
}

impl DanceConfig {
    fn validate(&self) -> Result<(), MotionError> {
        for (label, value) in [
            ("dance_threshold", self.dance_threshold),
            ("excited_threshold", self.excited_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MotionError::InvalidConfig(format!("{label} = {value}")));
            }
        }
        Ok(())
    }
}
