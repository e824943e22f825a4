mod common;

use common::{MockBus, action_joints, pose};
use motion::{AnimationEngine, EngineConfig, Frame, Recording, RecordingStore, SharedBus};
use std::sync::{Arc, Mutex};

fn frames_yaw(values: &[f64]) -> Vec<Frame> {
    values
        .iter()
        .map(|&v| pose(&[("base_yaw", v), ("head_pitch", 0.0)]))
        .collect()
}

fn build_engine() -> (AnimationEngine, Arc<Mutex<common::BusLog>>) {
    let bus = MockBus::new(pose(&[("base_yaw", 0.0), ("head_pitch", 0.0)]));
    let log = bus.log.clone();
    let bus: SharedBus = Arc::new(Mutex::new(bus));
    let store = Arc::new(RecordingStore::new("/nonexistent", None));
    store.insert(Recording::new(
        "idle",
        frames_yaw(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0]),
    ));
    store.insert(Recording::new("wave", frames_yaw(&[100.0, 110.0, 120.0])));
    let cfg = EngineConfig {
        fps: 10.0,
        interp_duration: 0.5, // 5 interpolation steps
        ..EngineConfig::default()
    };
    let engine = AnimationEngine::new(bus, store, cfg).unwrap();
    (engine, log)
}

#[test]
fn play_reads_starting_pose_once() {
    let (engine, log) = build_engine();
    engine.play("idle").unwrap();
    assert_eq!(log.lock().unwrap().reads, 1);
    // A second play with a known pose does not consult the bus.
    engine.tick();
    engine.play("wave").unwrap();
    assert_eq!(log.lock().unwrap().reads, 1);
}

#[test]
fn unknown_recording_leaves_state_untouched() {
    let (engine, log) = build_engine();
    assert!(engine.play("ghost").is_err());
    engine.tick();
    assert!(log.lock().unwrap().actions.is_empty());
    assert!(engine.status().active_recording.is_none());
}

#[test]
fn interpolation_blends_into_first_frame_then_plays_through() {
    let (engine, log) = build_engine();
    engine.play("idle").unwrap();

    // Ticks 1..=5 interpolate from the captured pose (0.0) to idle's
    // first frame (0.0), then frames advance in order.
    for _ in 0..14 {
        engine.tick();
    }
    {
        let actions = &log.lock().unwrap().actions;
        assert_eq!(actions.len(), 14);
        // Tick 6 plays idle frame 1, tick 14 plays frame 9.
        assert_eq!(action_joints(&actions[5])["base_yaw"], 1.0);
        assert_eq!(action_joints(&actions[13])["base_yaw"], 9.0);
    }
    assert_eq!(engine.status().frame_index, 10);

    // Superseding play: snapshot the current pose and blend toward
    // wave's first frame over duration * fps ticks.
    engine.play("wave").unwrap();
    for _ in 0..7 {
        engine.tick();
    }
    let actions = &log.lock().unwrap().actions;
    let blend: Vec<f64> = actions[14..19]
        .iter()
        .map(|a| action_joints(a)["base_yaw"])
        .collect();
    // Monotonic from 9.0 toward 100.0, landing exactly on the target.
    for pair in blend.windows(2) {
        assert!(pair[1] > pair[0], "blend not monotonic: {blend:?}");
    }
    assert!(blend[0] > 9.0 && blend[0] < 100.0);
    assert_eq!(blend[4], 100.0);
    // Then the remaining wave frames in order.
    assert_eq!(action_joints(&actions[19])["base_yaw"], 110.0);
    assert_eq!(action_joints(&actions[20])["base_yaw"], 120.0);
}

#[test]
fn finished_recording_interpolates_back_to_idle() {
    let (engine, log) = build_engine();
    engine.play("wave").unwrap();
    // 5 interp + 2 frames + 1 finish tick.
    for _ in 0..8 {
        engine.tick();
    }
    assert_eq!(engine.status().active_recording.as_deref(), Some("idle"));
    // The next ticks blend from wave's last pose down toward idle.
    engine.tick();
    engine.tick();
    let actions = &log.lock().unwrap().actions;
    let a = action_joints(&actions[actions.len() - 2])["base_yaw"];
    let b = action_joints(&actions[actions.len() - 1])["base_yaw"];
    assert!(a < 120.0);
    assert!(b < a);
}

#[test]
fn contended_ticks_defer_playback_instead_of_dropping_frames() {
    let bus_impl = MockBus::new(pose(&[("base_yaw", 0.0), ("head_pitch", 0.0)]));
    let log = bus_impl.log.clone();
    let bus: SharedBus = Arc::new(Mutex::new(bus_impl));
    let store = Arc::new(RecordingStore::new("/nonexistent", None));
    store.insert(Recording::new("idle", frames_yaw(&[0.0, 1.0, 2.0, 3.0])));
    let cfg = EngineConfig {
        fps: 10.0,
        interp_duration: 0.2,
        ..EngineConfig::default()
    };
    let engine = AnimationEngine::new(bus.clone(), store, cfg).unwrap();

    engine.play("idle").unwrap();
    // 2 interpolation steps, then frames 1 and 2.
    for _ in 0..4 {
        engine.tick();
    }
    let before = engine.status().frame_index;
    let actions_before = log.lock().unwrap().actions.len();

    // Another producer holds the bus across two ticks: no frame is
    // consumed and nothing reaches the bus.
    {
        let _holder = bus.lock().unwrap();
        engine.tick();
        engine.tick();
    }
    assert_eq!(engine.status().frame_index, before);
    assert_eq!(log.lock().unwrap().actions.len(), actions_before);

    // Playback resumes exactly where it left off.
    engine.tick();
    assert_eq!(engine.status().frame_index, before + 1);
    let actions = &log.lock().unwrap().actions;
    assert_eq!(actions.len(), actions_before + 1);
    assert_eq!(action_joints(actions.last().unwrap())["base_yaw"], 3.0);
}

#[test]
fn idle_recording_loops() {
    let (engine, _log) = build_engine();
    engine.play("idle").unwrap();
    // 5 interp + 11 remaining frames + 1 loop tick.
    for _ in 0..17 {
        engine.tick();
    }
    let status = engine.status();
    assert_eq!(status.active_recording.as_deref(), Some("idle"));
    // Wrapped around instead of stopping.
    assert!(status.frame_index <= 2);
}
