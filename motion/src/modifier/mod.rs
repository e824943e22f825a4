//! Procedural "life" overlays: small per-joint angular offsets
//! composed additively on top of whatever pose the engine is about to
//! write.

mod breathing;
mod music;
mod sway;
mod twitch;

pub use breathing::BreathingModifier;
pub use music::{MusicModifier, MusicSource};
pub use sway::SwayModifier;
pub use twitch::TwitchModifier;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// A time-varying per-joint angular offset. Offsets are a function of
/// elapsed time since the modifier was last enabled; stateful
/// modifiers (twitch scheduling, music polling) advance on the first
/// `offset` call of each new `elapsed` value.
pub trait Modifier: Send {
    fn offset(&mut self, joint: &str, elapsed: Duration) -> f64;

    /// Called when the owning entry is (re)enabled.
    fn reset(&mut self) {}
}

/// Closed set of modifier implementations. One match instead of
/// virtual dispatch in the per-tick hot path.
pub enum ModifierKind {
    Music(MusicModifier),
    Breathing(BreathingModifier),
    Twitch(TwitchModifier),
    Sway(SwayModifier),
}

impl Modifier for ModifierKind {
    fn offset(&mut self, joint: &str, elapsed: Duration) -> f64 {
        match self {
            ModifierKind::Music(m) => m.offset(joint, elapsed),
            ModifierKind::Breathing(m) => m.offset(joint, elapsed),
            ModifierKind::Twitch(m) => m.offset(joint, elapsed),
            ModifierKind::Sway(m) => m.offset(joint, elapsed),
        }
    }

    fn reset(&mut self) {
        match self {
            ModifierKind::Music(m) => m.reset(),
            ModifierKind::Breathing(m) => m.reset(),
            ModifierKind::Twitch(m) => m.reset(),
            ModifierKind::Sway(m) => m.reset(),
        }
    }
}

/// A registered modifier: the enable flag, its target joints, and the
/// clock epoch offsets are measured from.
pub struct ModifierEntry {
    name: String,
    joints: HashSet<String>,
    enabled: bool,
    epoch: Instant,
    kind: ModifierKind,
}

impl ModifierEntry {
    pub fn new(
        name: impl Into<String>,
        joints: impl IntoIterator<Item = String>,
        kind: ModifierKind,
    ) -> Self {
        Self {
            name: name.into(),
            joints: joints.into_iter().collect(),
            enabled: false,
            epoch: Instant::now(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

/// Ordered collection of modifiers, applied additively in
/// registration order.
#[derive(Default)]
pub struct ModifierStack {
    entries: Vec<ModifierEntry>,
}

impl ModifierStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: ModifierEntry) {
        debug!(name = %entry.name, joints = entry.joints.len(), "registering modifier");
        self.entries.push(entry);
    }

    /// Enable `name`, resetting its clock epoch to `now` on the
    /// transition from disabled. Returns `false` for unknown names.
    pub fn enable(&mut self, name: &str, now: Instant) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) else {
            return false;
        };
        if !entry.enabled {
            entry.enabled = true;
            entry.epoch = now;
            entry.kind.reset();
        }
        true
    }

    /// Disable `name`. Idempotent; returns `false` for unknown names.
    pub fn disable(&mut self, name: &str) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) else {
            return false;
        };
        entry.enabled = false;
        true
    }

    /// Consume the stack, yielding entries in registration order.
    pub fn into_entries(self) -> Vec<ModifierEntry> {
        self.entries
    }

    pub fn any_enabled(&self) -> bool {
        self.entries.iter().any(|e| e.enabled)
    }

    pub fn list(&self) -> HashMap<String, bool> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), e.enabled))
            .collect()
    }

    /// Add each enabled modifier's offset to every joint present in
    /// both `action` and the modifier's target set. Never overwrites,
    /// always adds.
    pub fn apply(&mut self, action: &mut HashMap<String, f64>, now: Instant) {
        for entry in &mut self.entries {
            if !entry.enabled {
                continue;
            }
            let elapsed = now.saturating_duration_since(entry.epoch);
            for (joint, angle) in action.iter_mut() {
                if entry.joints.contains(joint) {
                    *angle += entry.kind.offset(joint, elapsed);
                }
            }
        }
    }
}

/// The stack the demo binary ships with: breathing and sway always
/// available, twitch for idle texture, and a music modifier when a
/// source is connected.
pub fn default_stack(joints: &[String], music: Option<Arc<dyn MusicSource>>) -> ModifierStack {
    let owned = || joints.iter().cloned();
    let mut stack = ModifierStack::new();
    stack.register(ModifierEntry::new(
        "breathing",
        owned(),
        ModifierKind::Breathing(BreathingModifier::new(1.5, 0.2)),
    ));
    stack.register(ModifierEntry::new(
        "sway",
        owned(),
        ModifierKind::Sway(SwayModifier::new((2.0, 0.1), (0.8, 0.23))),
    ));
    stack.register(ModifierEntry::new(
        "twitch",
        owned(),
        ModifierKind::Twitch(TwitchModifier::new(4.0, 12.0, 3.0, 0.4)),
    ));
    if let Some(source) = music {
        stack.register(ModifierEntry::new(
            "music",
            owned(),
            ModifierKind::Music(MusicModifier::new(source, joints.to_vec())),
        ));
    }
    stack
}
