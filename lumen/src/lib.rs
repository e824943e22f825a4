pub mod logging;
pub mod sim;

pub use logging::init_logging;
pub use sim::{FixedTempo, SimulatedBus};

use motion::{Frame, Recording, RecordingStore};
use std::f64::consts::TAU;

/// Joints of the demo lamp, base to head.
pub const JOINTS: &[&str] = &["base_yaw", "shoulder_lift", "elbow_flex", "head_pitch"];

/// Seed the store with synthesized choreography so the demo runs
/// without recording files on disk. Real deployments ship CSV
/// recordings and users may shadow them from their own directory.
pub fn seed_demo_recordings(store: &RecordingStore, fps: f64) {
    let frames = |seconds: f64, pose: &dyn Fn(f64) -> Frame| -> Vec<Frame> {
        let count = (seconds * fps).round().max(1.0) as usize;
        (0..count)
            .map(|i| pose(i as f64 / fps))
            .collect()
    };
    let lamp_pose = |yaw: f64, lift: f64, flex: f64, pitch: f64| -> Frame {
        [
            ("base_yaw", yaw),
            ("shoulder_lift", lift),
            ("elbow_flex", flex),
            ("head_pitch", pitch),
        ]
        .into_iter()
        .map(|(j, a)| (j.to_string(), a))
        .collect()
    };

    store.insert(Recording::new(
        "idle",
        frames(6.0, &|t| {
            let nod = 2.0 * (TAU * t / 6.0).sin();
            lamp_pose(0.0, -10.0, 25.0, 5.0 + nod)
        }),
    ));
    store.insert(Recording::new(
        "wave",
        frames(2.5, &|t| {
            let swing = 20.0 * (TAU * t * 1.2).sin();
            lamp_pose(swing, -5.0, 30.0, 10.0)
        }),
    ));
    store.insert(Recording::new(
        "dancing1",
        frames(4.0, &|t| {
            let beat = (TAU * t).sin();
            lamp_pose(15.0 * beat, -12.0 + 4.0 * beat, 28.0, 8.0 * beat)
        }),
    ));
    store.insert(Recording::new(
        "dancing2",
        frames(4.0, &|t| {
            let beat = (TAU * t * 0.75).sin();
            lamp_pose(-10.0 * beat, -8.0, 22.0 + 6.0 * beat, -6.0 * beat)
        }),
    ));
    store.insert(Recording::new(
        "dancing3",
        frames(3.0, &|t| {
            let beat = (TAU * t * 1.5).sin();
            lamp_pose(20.0 * beat, -14.0 + 6.0 * beat, 30.0, 10.0 * beat)
        }),
    ));
    store.insert(Recording::new(
        "head_bob",
        frames(4.0, &|t| {
            let bob = (TAU * t).sin();
            lamp_pose(0.0, -10.0, 25.0, 5.0 + 10.0 * bob)
        }),
    ));
    store.insert(Recording::new(
        "shake",
        frames(2.0, &|t| {
            let jitter = (TAU * t * 2.0).sin();
            lamp_pose(12.0 * jitter, -12.0, 26.0, 6.0 - 4.0 * jitter)
        }),
    ));
    store.insert(Recording::new(
        "sleep",
        frames(3.0, &|t| {
            let p = (t / 3.0).min(1.0);
            lamp_pose(0.0, -10.0 - 25.0 * p, 25.0 + 30.0 * p, 5.0 - 40.0 * p)
        }),
    ));
    store.insert(Recording::new(
        "wake_up",
        frames(3.0, &|t| {
            let p = (t / 3.0).min(1.0);
            lamp_pose(0.0, -35.0 + 25.0 * p, 55.0 - 30.0 * p, -35.0 + 40.0 * p)
        }),
    ));
}
