use motion::{Modifier, TwitchModifier};
use std::time::Duration;

/// With `min_interval == max_interval == 3.0` the schedule is fully
/// deterministic: exactly one pulse per 3-second window, the next
/// window starting when a pulse ends.
#[test]
fn fixed_interval_fires_one_pulse_per_window() {
    let mut twitch = TwitchModifier::new(3.0, 3.0, 2.5, 0.4).with_seed(7);
    let step = 0.05;
    let mut starts = Vec::new();
    let mut in_pulse = false;
    let mut t = 0.0;
    while t < 10.2 {
        let offset = twitch.offset("head_pitch", Duration::from_secs_f64(t));
        assert!(offset.abs() <= 2.5 + 1e-9);
        let active = offset != 0.0;
        if active && !in_pulse {
            starts.push(t);
        }
        in_pulse = active;
        t += step;
    }
    assert_eq!(starts.len(), 3, "pulse starts: {starts:?}");
    for pair in starts.windows(2) {
        let gap = pair[1] - pair[0];
        assert!((3.3..=3.55).contains(&gap), "gap {gap} between {pair:?}");
    }
}

#[test]
fn quiet_before_first_interval_expires() {
    let mut twitch = TwitchModifier::new(3.0, 3.0, 2.5, 0.4).with_seed(7);
    let mut t = 0.0;
    while t < 2.9 {
        assert_eq!(twitch.offset("base_yaw", Duration::from_secs_f64(t)), 0.0);
        t += 0.1;
    }
}

#[test]
fn pulse_peaks_are_bounded_per_joint() {
    let mut twitch = TwitchModifier::new(1.0, 1.0, 3.0, 0.5).with_seed(42);
    let joints = ["base_yaw", "shoulder_lift", "elbow_flex", "head_pitch"];
    let mut t = 0.0;
    while t < 20.0 {
        for joint in joints {
            let offset = twitch.offset(joint, Duration::from_secs_f64(t));
            assert!(offset.abs() <= 3.0 + 1e-9, "joint {joint} at t = {t}");
        }
        t += 0.03;
    }
}

#[test]
fn reset_rearms_the_scheduler() {
    let mut twitch = TwitchModifier::new(2.0, 2.0, 1.0, 0.3).with_seed(1);
    // Walk into the first pulse.
    let mut t = 0.0;
    while t < 2.1 {
        twitch.offset("base_yaw", Duration::from_secs_f64(t));
        t += 0.05;
    }
    twitch.reset();
    // After a reset the elapsed clock starts over: nothing fires
    // before a fresh interval has passed.
    assert_eq!(twitch.offset("base_yaw", Duration::from_secs_f64(0.1)), 0.0);
    assert_eq!(twitch.offset("base_yaw", Duration::from_secs_f64(1.9)), 0.0);
    // Arms at 2.0; mid-pulse samples are nonzero.
    twitch.offset("base_yaw", Duration::from_secs_f64(2.05));
    assert_ne!(twitch.offset("base_yaw", Duration::from_secs_f64(2.15)), 0.0);
}
