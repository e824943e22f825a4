use motion::{MotionError, MotorBus, Register};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Everything the engine did to the bus, in order of occurrence.
#[derive(Default)]
pub struct BusLog {
    pub actions: Vec<HashMap<String, f64>>,
    pub writes: Vec<(Register, HashMap<String, f64>)>,
    pub reads: usize,
    pub torque_disables: usize,
}

/// [`MotorBus`] double that records every call.
pub struct MockBus {
    pub present: Mutex<HashMap<String, f64>>,
    pub log: Arc<Mutex<BusLog>>,
    pub connected: bool,
}

impl MockBus {
    pub fn new(present: HashMap<String, f64>) -> Self {
        Self {
            present: Mutex::new(present),
            log: Arc::new(Mutex::new(BusLog::default())),
            connected: true,
        }
    }
}

impl MotorBus for MockBus {
    fn sync_read(&self, _register: Register) -> Result<HashMap<String, f64>, MotionError> {
        self.log.lock().unwrap().reads += 1;
        Ok(self.present.lock().unwrap().clone())
    }

    fn sync_write(
        &self,
        register: Register,
        values: &HashMap<String, f64>,
    ) -> Result<(), MotionError> {
        self.log
            .lock()
            .unwrap()
            .writes
            .push((register, values.clone()));
        Ok(())
    }

    fn send_action(
        &self,
        action: &HashMap<String, f64>,
    ) -> Result<HashMap<String, f64>, MotionError> {
        self.log.lock().unwrap().actions.push(action.clone());
        Ok(action.clone())
    }

    fn disable_torque(&self) -> Result<(), MotionError> {
        self.log.lock().unwrap().torque_disables += 1;
        Ok(())
    }

    fn apply_preset(&self, _name: &str) -> bool {
        true
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

pub fn pose(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs
        .iter()
        .map(|(joint, angle)| ((*joint).to_string(), *angle))
        .collect()
}

/// Strip the `.pos` suffix a bus action carries on every key.
pub fn action_joints(action: &HashMap<String, f64>) -> HashMap<String, f64> {
    action
        .iter()
        .map(|(key, &angle)| (key.trim_end_matches(".pos").to_string(), angle))
        .collect()
}
