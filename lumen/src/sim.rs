use motion::{MotionError, MotorBus, MusicSource, Register};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

/// In-memory [`MotorBus`] that tracks goal positions and logs every
/// action, so the engine can run end to end without hardware.
pub struct SimulatedBus {
    positions: Mutex<HashMap<String, f64>>,
}

impl SimulatedBus {
    pub fn new(home: HashMap<String, f64>) -> Self {
        Self {
            positions: Mutex::new(home),
        }
    }

    pub fn with_joints(joints: &[&str]) -> Self {
        Self::new(joints.iter().map(|j| ((*j).to_string(), 0.0)).collect())
    }
}

impl MotorBus for SimulatedBus {
    fn sync_read(&self, _register: Register) -> Result<HashMap<String, f64>, MotionError> {
        Ok(self.positions.lock().unwrap().clone())
    }

    fn sync_write(
        &self,
        register: Register,
        values: &HashMap<String, f64>,
    ) -> Result<(), MotionError> {
        debug!(?register, joints = values.len(), "sim sync_write");
        self.positions.lock().unwrap().extend(values.clone());
        Ok(())
    }

    fn send_action(
        &self,
        action: &HashMap<String, f64>,
    ) -> Result<HashMap<String, f64>, MotionError> {
        let mut positions = self.positions.lock().unwrap();
        for (key, &angle) in action {
            let joint = key.strip_suffix(".pos").unwrap_or(key);
            positions.insert(joint.to_string(), angle);
        }
        debug!(joints = action.len(), "sim action");
        Ok(action.clone())
    }

    fn disable_torque(&self) -> Result<(), MotionError> {
        info!("sim torque disabled");
        Ok(())
    }

    fn apply_preset(&self, name: &str) -> bool {
        info!(%name, "sim preset applied");
        true
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// [`MusicSource`] with a fixed tempo and energy, for demos.
pub struct FixedTempo {
    bpm: f32,
    energy: f32,
}

impl FixedTempo {
    pub fn new(bpm: f32, energy: f32) -> Self {
        Self { bpm, energy }
    }
}

impl MusicSource for FixedTempo {
    fn bpm(&self) -> f32 {
        self.bpm
    }

    fn is_playing(&self) -> bool {
        true
    }

    fn energy(&self) -> f32 {
        self.energy
    }
}
