//! Motion-control engine for the Lumen robotic lamp.
//!
//! The [`engine::AnimationEngine`] ticks at a fixed frame rate,
//! playing choreographed [`recording::Recording`]s, blending between
//! them, and layering procedural [`modifier`] offsets (music sync,
//! breathing, twitch, sway) on top, while arbitrating exclusive
//! access to the shared [`bus::MotorBus`] among concurrent producers.
//! External callers reach it through [`command::EngineCommand`]s
//! dispatched over a single-outstanding-event [`slot::EventSlot`].

pub mod bus;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod face;
pub mod modifier;
pub mod recording;
pub mod slot;

pub use bus::{MotorBus, NoopBus, Register, SharedBus};
pub use command::{EngineCommand, EngineCommandHandler};
pub use config::{DanceConfig, EngineConfig, FaceTrackingConfig};
pub use engine::{AnimationEngine, EngineStatus, SLEEP_ALLOWED};
pub use error::MotionError;
pub use face::FaceTrackingController;
pub use modifier::{
    BreathingModifier, Modifier, ModifierEntry, ModifierKind, ModifierStack, MusicModifier,
    MusicSource, SwayModifier, TwitchModifier, default_stack,
};
pub use recording::{Frame, Recording, RecordingStore};
pub use slot::{EventSlot, SlotHandler};
