use crate::error::MotionError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Motor-bus registers the engine reads and writes. The underlying
/// wire protocol and register map belong to the bus driver, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    GoalPosition,
    PresentPosition,
}

/// The shared hardware bus the engine and external callers contend
/// for. One physical resource, so implementations live behind a
/// single [`SharedBus`] mutex; critical sections are one read or one
/// write, never spanning a sleep.
///
/// Angles are degrees keyed by joint name. [`MotorBus::send_action`]
/// takes `"<joint>.pos"` keys and echoes back what was sent.
pub trait MotorBus: Send {
    fn sync_read(&self, register: Register) -> Result<HashMap<String, f64>, MotionError>;
    fn sync_write(
        &self,
        register: Register,
        values: &HashMap<String, f64>,
    ) -> Result<(), MotionError>;
    fn send_action(
        &self,
        action: &HashMap<String, f64>,
    ) -> Result<HashMap<String, f64>, MotionError>;
    fn disable_torque(&self) -> Result<(), MotionError>;
    fn apply_preset(&self, name: &str) -> bool;
    fn is_connected(&self) -> bool;
}

/// Handle to the one shared bus. The engine only ever `try_lock`s it
/// inside `tick()`; external callers may block on it for one-off
/// direct commands.
pub type SharedBus = Arc<Mutex<dyn MotorBus>>;

/// [`MotorBus`] implementation that accepts everything and does
/// nothing. Useful for composing the engine without hardware.
#[derive(Clone, Default)]
pub struct NoopBus;

impl MotorBus for NoopBus {
    fn sync_read(&self, _register: Register) -> Result<HashMap<String, f64>, MotionError> {
        Ok(HashMap::new())
    }

    fn sync_write(
        &self,
        _register: Register,
        _values: &HashMap<String, f64>,
    ) -> Result<(), MotionError> {
        Ok(())
    }

    fn send_action(
        &self,
        action: &HashMap<String, f64>,
    ) -> Result<HashMap<String, f64>, MotionError> {
        Ok(action.clone())
    }

    fn disable_torque(&self) -> Result<(), MotionError> {
        Ok(())
    }

    fn apply_preset(&self, _name: &str) -> bool {
        true
    }

    fn is_connected(&self) -> bool {
        true
    }
}
