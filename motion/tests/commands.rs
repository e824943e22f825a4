mod common;

use common::{MockBus, pose};
use motion::{
    AnimationEngine, EngineCommand, EngineCommandHandler, EngineConfig, EventSlot, Recording,
    RecordingStore, SharedBus,
};
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

fn build_engine() -> AnimationEngine {
    let bus: SharedBus = Arc::new(Mutex::new(MockBus::new(pose(&[("base_yaw", 0.0)]))));
    let store = Arc::new(RecordingStore::new("/nonexistent", None));
    store.insert(Recording::new(
        "wave",
        vec![pose(&[("base_yaw", 1.0)]), pose(&[("base_yaw", 2.0)])],
    ));
    AnimationEngine::new(bus, store, EngineConfig::default()).unwrap()
}

#[tokio::test]
async fn play_command_stages_playback() {
    let engine = build_engine();
    let slot: EventSlot<EngineCommand> = EventSlot::new();
    slot.start(Arc::new(EngineCommandHandler::new(engine.clone())));

    slot.dispatch("play", EngineCommand::Play { name: "wave".into() }, 0);
    assert!(slot.wait_until_idle(Duration::from_secs(2)).await);
    engine.tick();
    assert_eq!(engine.status().active_recording.as_deref(), Some("wave"));
    slot.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn mode_commands_flip_engine_flags() {
    let engine = build_engine();
    let slot: EventSlot<EngineCommand> = EventSlot::new();
    slot.start(Arc::new(EngineCommandHandler::new(engine.clone())));

    slot.dispatch("mode", EngineCommand::SetDanceMode { enabled: true }, 0);
    assert!(slot.wait_until_idle(Duration::from_secs(2)).await);
    assert!(engine.is_dance_mode());

    slot.dispatch("mode", EngineCommand::EnablePushable, 0);
    assert!(slot.wait_until_idle(Duration::from_secs(2)).await);
    assert!(engine.is_pushable_mode());

    slot.dispatch("mode", EngineCommand::DisablePushable, 0);
    assert!(slot.wait_until_idle(Duration::from_secs(2)).await);
    assert!(!engine.is_pushable_mode());
    slot.stop(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn rejected_play_does_not_kill_the_worker() {
    let engine = build_engine();
    let slot: EventSlot<EngineCommand> = EventSlot::new();
    slot.start(Arc::new(EngineCommandHandler::new(engine.clone())));

    slot.dispatch("play", EngineCommand::Play { name: "ghost".into() }, 0);
    assert!(slot.wait_until_idle(Duration::from_secs(2)).await);
    // The worker is still alive and consuming.
    slot.dispatch("play", EngineCommand::Play { name: "wave".into() }, 0);
    assert!(slot.wait_until_idle(Duration::from_secs(2)).await);
    engine.tick();
    assert_eq!(engine.status().active_recording.as_deref(), Some("wave"));
    slot.stop(Duration::from_secs(1)).await;
}

#[test]
fn commands_round_trip_through_json() {
    let cmd: EngineCommand =
        serde_json::from_str(r#"{"op":"play","name":"wave"}"#).unwrap();
    assert!(matches!(cmd, EngineCommand::Play { ref name } if name == "wave"));

    let cmd: EngineCommand = serde_json::from_str(
        r#"{"op":"set_sleep_mode","enabled":true,"release_motors":false}"#,
    )
    .unwrap();
    let json = serde_json::to_string(&cmd).unwrap();
    assert!(json.contains("set_sleep_mode"));
}
