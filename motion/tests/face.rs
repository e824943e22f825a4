use motion::{FaceTrackingConfig, FaceTrackingController};

fn controller() -> FaceTrackingController {
    let cfg = FaceTrackingConfig {
        scale: 20.0,
        dead_zone: 0.05,
        smoothing: 0.25,
        max_swing: 30.0,
        min_motion: 0.2,
        ..FaceTrackingConfig::default()
    };
    let mut face = FaceTrackingController::new(cfg);
    face.reset(10.0, 0.0);
    face
}

#[test]
fn converges_exponentially_toward_the_offset_target() {
    let mut face = controller();
    for _ in 0..100 {
        face.step(Some((1.0, 0.0)));
    }
    let (yaw, pitch) = face.current();
    assert!((yaw - 30.0).abs() < 0.1, "yaw = {yaw}");
    assert!(pitch.abs() < 0.1, "pitch = {pitch}");
}

#[test]
fn approach_is_monotonic() {
    let mut face = controller();
    let mut previous = face.current().0;
    for _ in 0..50 {
        face.step(Some((1.0, 0.0)));
        let yaw = face.current().0;
        assert!(yaw >= previous);
        previous = yaw;
    }
}

#[test]
fn dead_zone_suppresses_jitter() {
    let mut face = controller();
    // The first step always reports the home pose once.
    face.step(Some((0.02, -0.03)));
    for _ in 0..20 {
        assert_eq!(face.step(Some((0.02, -0.03))), None);
    }
    let (yaw, pitch) = face.current();
    assert_eq!(yaw, 10.0);
    assert_eq!(pitch, 0.0);
}

#[test]
fn relaxes_to_home_when_no_face_is_visible() {
    let mut face = controller();
    for _ in 0..50 {
        face.step(Some((1.0, 0.5)));
    }
    for _ in 0..200 {
        face.step(None);
    }
    let (yaw, pitch) = face.current();
    assert!((yaw - 10.0).abs() < 0.05, "yaw = {yaw}");
    assert!(pitch.abs() < 0.05, "pitch = {pitch}");
}

#[test]
fn targets_clamp_to_the_safe_envelope() {
    let cfg = FaceTrackingConfig {
        scale: 100.0,
        max_swing: 15.0,
        smoothing: 0.5,
        ..FaceTrackingConfig::default()
    };
    let mut face = FaceTrackingController::new(cfg);
    face.reset(0.0, 0.0);
    for _ in 0..100 {
        face.step(Some((1.0, -1.0)));
    }
    let (yaw, pitch) = face.current();
    assert!(yaw <= 15.0 + 1e-9);
    assert!(pitch <= 15.0 + 1e-9);
}

#[test]
fn camera_y_maps_to_inverted_pitch() {
    let mut face = controller();
    // Face below frame center: the lamp should look down.
    for _ in 0..50 {
        face.step(Some((0.0, 0.5)));
    }
    assert!(face.current().1 < 0.0);
}

#[test]
fn writes_are_gated_by_minimum_motion() {
    let cfg = FaceTrackingConfig {
        scale: 20.0,
        dead_zone: 0.05,
        smoothing: 0.01, // crawl toward the target
        min_motion: 1.0,
        max_swing: 30.0,
        ..FaceTrackingConfig::default()
    };
    let mut face = FaceTrackingController::new(cfg);
    face.reset(0.0, 0.0);
    face.step(Some((1.0, 0.0)));
    // Movement per step is ~0.2 degrees; writes only land once a
    // full degree has accumulated.
    let mut writes = 0;
    let mut steps_between = Vec::new();
    let mut since_last = 0;
    for _ in 0..40 {
        since_last += 1;
        if face.step(Some((1.0, 0.0))).is_some() {
            writes += 1;
            steps_between.push(since_last);
            since_last = 0;
        }
    }
    assert!(writes >= 2);
    assert!(steps_between.iter().all(|&n| n >= 3), "{steps_between:?}");
}
