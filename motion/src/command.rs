use crate::engine::AnimationEngine;
use crate::slot::SlotHandler;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Instructions external producers (API handlers, voice-agent tool
/// calls, sensors) send the engine through an
/// [`EventSlot`](crate::slot::EventSlot). At most one is pending at a
/// time; a burst of commands keeps only the latest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EngineCommand {
    Play { name: String },
    SetSleepMode { enabled: bool, release_motors: bool },
    EnablePushable,
    DisablePushable,
    SetManualOverride { enabled: bool },
    SetFaceTracking { enabled: bool },
    SetDanceMode { enabled: bool },
    EnableModifier { name: String },
    DisableModifier { name: String },
    Gaze { target: Option<(f64, f64)> },
}

/// Applies [`EngineCommand`]s to an [`AnimationEngine`]. Failures are
/// logged inside the engine and never propagate to dispatchers.
pub struct EngineCommandHandler {
    engine: AnimationEngine,
}

impl EngineCommandHandler {
    pub fn new(engine: AnimationEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl SlotHandler<EngineCommand> for EngineCommandHandler {
    async fn handle(&self, _kind: &str, command: EngineCommand) -> anyhow::Result<()> {
        match command {
            EngineCommand::Play { name } => {
                // Rejections (sleep guard, unknown name) are already
                // logged; a dropped command is the documented outcome.
                let _ = self.engine.play(&name);
            }
            EngineCommand::SetSleepMode {
                enabled,
                release_motors,
            } => self.engine.set_sleep_mode(enabled, release_motors),
            EngineCommand::EnablePushable => self.engine.enable_pushable_mode(),
            EngineCommand::DisablePushable => self.engine.disable_pushable_mode(),
            EngineCommand::SetManualOverride { enabled } => {
                self.engine.set_manual_override(enabled)
            }
            EngineCommand::SetFaceTracking { enabled } => {
                self.engine.set_face_tracking_mode(enabled)
            }
            EngineCommand::SetDanceMode { enabled } => self.engine.set_dance_mode(enabled),
            EngineCommand::EnableModifier { name } => {
                self.engine.enable_modifier(&name);
            }
            EngineCommand::DisableModifier { name } => {
                self.engine.disable_modifier(&name);
            }
            EngineCommand::Gaze { target } => self.engine.set_gaze(target),
        }
        Ok(())
    }
}
