use crate::bus::{MotorBus, Register, SharedBus};
use crate::config::EngineConfig;
use crate::error::MotionError;
use crate::face::FaceTrackingController;
use crate::modifier::{ModifierEntry, ModifierStack, MusicSource};
use crate::recording::{Frame, Recording, RecordingStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Recordings that may start while sleep mode is active.
pub const SLEEP_ALLOWED: &[&str] = &["sleep", "wake_up", "timer_up", "alarm"];

/// A `play()` accepted but not yet observed by the tick task. The
/// tick task is the sole writer of [`Playback`]; callers stage intent
/// here instead of mutating playback directly.
struct StagedPlay {
    recording: Arc<Recording>,
    /// Bus positions read by `play()` when the engine had never
    /// observed any, so the first interpolation has a starting pose.
    start: Option<HashMap<String, f64>>,
}

/// Playback state. Written only by the tick task; setters read it
/// briefly to snapshot poses.
#[derive(Default)]
struct Playback {
    current: HashMap<String, f64>,
    active: Option<Arc<Recording>>,
    frame_index: usize,
    interp_total: usize,
    interp_remaining: usize,
    interp_start: HashMap<String, f64>,
    interp_target: Option<Frame>,
}

impl Playback {
    fn clear_active(&mut self) {
        self.active = None;
        self.frame_index = 0;
        self.interp_total = 0;
        self.interp_remaining = 0;
        self.interp_start.clear();
        self.interp_target = None;
    }
}

struct Shared {
    sleep: AtomicBool,
    pushable: AtomicBool,
    manual_override: AtomicBool,
    face_tracking: AtomicBool,
    dance: AtomicBool,
    release_on_sleep: AtomicBool,
    torque_released: AtomicBool,
    shutdown: AtomicBool,
    staged: Mutex<Option<StagedPlay>>,
    playback: Mutex<Playback>,
    modifiers: Mutex<ModifierStack>,
    face: Mutex<FaceTrackingController>,
    gaze: Mutex<Option<(f64, f64)>>,
    held: Mutex<Option<HashMap<String, f64>>>,
    last_dance: Mutex<Option<String>>,
    rng: Mutex<StdRng>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Snapshot of engine state for dashboards and agents.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub active_recording: Option<String>,
    pub frame_index: usize,
    pub sleep_mode: bool,
    pub pushable_mode: bool,
    pub manual_override: bool,
    pub face_tracking_mode: bool,
    pub dance_mode: bool,
    pub modifiers: HashMap<String, bool>,
}

/// The central scheduler: owns playback state, mode flags and the bus
/// lock, and ticks at a fixed frame rate.
///
/// Exactly one behavior governs bus writes on a given tick, in fixed
/// precedence order: manual override, pushable hold, sleep block,
/// face tracking, idle modifiers, playback. All bus access inside a
/// tick is non-blocking; a contended bus defers the frame instead of
/// stalling the scheduler.
#[derive(Clone)]
pub struct AnimationEngine {
    bus: SharedBus,
    store: Arc<RecordingStore>,
    music: Option<Arc<dyn MusicSource>>,
    cfg: EngineConfig,
    shared: Arc<Shared>,
}

impl AnimationEngine {
    pub fn new(
        bus: SharedBus,
        store: Arc<RecordingStore>,
        cfg: EngineConfig,
    ) -> Result<Self, MotionError> {
        cfg.validate()?;
        let face = FaceTrackingController::new(cfg.face.clone());
        Ok(Self {
            bus,
            store,
            music: None,
            cfg,
            shared: Arc::new(Shared {
                sleep: AtomicBool::new(false),
                pushable: AtomicBool::new(false),
                manual_override: AtomicBool::new(false),
                face_tracking: AtomicBool::new(false),
                dance: AtomicBool::new(false),
                release_on_sleep: AtomicBool::new(false),
                torque_released: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
                staged: Mutex::new(None),
                playback: Mutex::new(Playback::default()),
                modifiers: Mutex::new(ModifierStack::new()),
                face: Mutex::new(face),
                gaze: Mutex::new(None),
                held: Mutex::new(None),
                last_dance: Mutex::new(None),
                rng: Mutex::new(StdRng::from_entropy()),
                task: Mutex::new(None),
            }),
        })
    }

    /// Attach the optional tempo/energy signal. Resolved once at
    /// composition time; without it, dance mode never chains clips
    /// and the music modifier has nothing to follow.
    pub fn with_music(mut self, source: Arc<dyn MusicSource>) -> Self {
        self.music = Some(source);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    // ------------------------------------------------------------------
    // Upward-facing surface
    // ------------------------------------------------------------------

    pub fn register_modifier(&self, entry: ModifierEntry) {
        self.shared.modifiers.lock().unwrap().register(entry);
    }

    pub fn enable_modifier(&self, name: &str) -> bool {
        self.shared
            .modifiers
            .lock()
            .unwrap()
            .enable(name, Instant::now())
    }

    pub fn disable_modifier(&self, name: &str) -> bool {
        self.shared.modifiers.lock().unwrap().disable(name)
    }

    pub fn list_modifiers(&self) -> HashMap<String, bool> {
        self.shared.modifiers.lock().unwrap().list()
    }

    pub fn is_sleep_mode(&self) -> bool {
        self.shared.sleep.load(Ordering::SeqCst)
    }

    pub fn is_pushable_mode(&self) -> bool {
        self.shared.pushable.load(Ordering::SeqCst)
    }

    pub fn is_manual_override(&self) -> bool {
        self.shared.manual_override.load(Ordering::SeqCst)
    }

    pub fn is_face_tracking_mode(&self) -> bool {
        self.shared.face_tracking.load(Ordering::SeqCst)
    }

    pub fn is_dance_mode(&self) -> bool {
        self.shared.dance.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> EngineStatus {
        let pb = self.shared.playback.lock().unwrap();
        EngineStatus {
            active_recording: pb.active.as_ref().map(|r| r.name.clone()),
            frame_index: pb.frame_index,
            sleep_mode: self.is_sleep_mode(),
            pushable_mode: self.is_pushable_mode(),
            manual_override: self.is_manual_override(),
            face_tracking_mode: self.is_face_tracking_mode(),
            dance_mode: self.is_dance_mode(),
            modifiers: self.list_modifiers(),
        }
    }

    /// Latest gaze offset from the vision pipeline, `None` when no
    /// face is visible. Consumed on face-tracking ticks.
    pub fn set_gaze(&self, gaze: Option<(f64, f64)>) {
        *self.shared.gaze.lock().unwrap() = gaze;
    }

    /// Stage a recording for playback. The tick task picks it up on
    /// the next frame, superseding any in-flight interpolation or
    /// playback; there is no queue.
    pub fn play(&self, name: &str) -> Result<(), MotionError> {
        if self.is_sleep_mode() && !SLEEP_ALLOWED.contains(&name) {
            debug!(%name, "play rejected by sleep guard");
            return Err(MotionError::InvalidModeTransition(format!(
                "`{name}` is not allowed during sleep"
            )));
        }
        let recording = match self.store.get(name) {
            Ok(r) => r,
            Err(e) => {
                warn!(%name, error = %e, "cannot play unknown recording");
                return Err(e);
            }
        };
        // Only read the bus when the engine has never observed a
        // pose; otherwise the tick task interpolates from its own
        // state. Blocking here is fine, play() runs on caller threads.
        let start = if self.shared.playback.lock().unwrap().current.is_empty() {
            let bus = self.bus.lock().unwrap();
            match bus.sync_read(Register::PresentPosition) {
                Ok(positions) => Some(positions),
                Err(e) => {
                    warn!(error = %e, "could not read starting pose, will jump to first frame");
                    None
                }
            }
        } else {
            None
        };
        *self.shared.staged.lock().unwrap() = Some(StagedPlay { recording, start });
        debug!(%name, "staged playback");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mode setters (idempotent, fail closed)
    // ------------------------------------------------------------------

    /// Torque release is deferred behind `release_motors` so an
    /// in-flight "goodnight" animation can finish before power drops.
    pub fn set_sleep_mode(&self, enabled: bool, release_motors: bool) {
        self.shared.sleep.store(enabled, Ordering::SeqCst);
        self.shared
            .release_on_sleep
            .store(enabled && release_motors, Ordering::SeqCst);
        if !enabled {
            self.shared.torque_released.store(false, Ordering::SeqCst);
        }
        info!(enabled, release_motors, "sleep mode");
    }

    pub fn enable_pushable_mode(&self) {
        if self.shared.pushable.swap(true, Ordering::SeqCst) {
            return;
        }
        let snapshot = self.shared.playback.lock().unwrap().current.clone();
        *self.shared.held.lock().unwrap() = Some(snapshot);
        info!("pushable mode enabled");
    }

    pub fn disable_pushable_mode(&self) {
        if !self.shared.pushable.swap(false, Ordering::SeqCst) {
            return;
        }
        *self.shared.held.lock().unwrap() = None;
        info!("pushable mode disabled");
    }

    /// The pose captured when pushable mode was enabled, if active.
    pub fn held_pose(&self) -> Option<HashMap<String, f64>> {
        self.shared.held.lock().unwrap().clone()
    }

    pub fn set_manual_override(&self, enabled: bool) {
        self.shared.manual_override.store(enabled, Ordering::SeqCst);
        info!(enabled, "manual override");
    }

    /// On enable, the current yaw/pitch become the tracking home.
    pub fn set_face_tracking_mode(&self, enabled: bool) {
        let was = self.shared.face_tracking.swap(enabled, Ordering::SeqCst);
        if enabled && !was {
            let (yaw, pitch) = self.current_head_pose();
            self.shared.face.lock().unwrap().reset(yaw, pitch);
        }
        info!(enabled, "face tracking mode");
    }

    pub fn set_dance_mode(&self, enabled: bool) {
        self.shared.dance.store(enabled, Ordering::SeqCst);
        if !enabled {
            *self.shared.last_dance.lock().unwrap() = None;
        }
        info!(enabled, "dance mode");
    }

    fn current_head_pose(&self) -> (f64, f64) {
        let pb = self.shared.playback.lock().unwrap();
        let lookup = |joint: &str| pb.current.get(joint).copied();
        let (yaw, pitch) = (
            lookup(&self.cfg.face.yaw_joint),
            lookup(&self.cfg.face.pitch_joint),
        );
        drop(pb);
        match (yaw, pitch) {
            (Some(y), Some(p)) => (y, p),
            _ => {
                // Never observed a pose; ask the hardware directly.
                let bus = self.bus.lock().unwrap();
                let read = bus.sync_read(Register::PresentPosition).unwrap_or_default();
                (
                    read.get(&self.cfg.face.yaw_joint).copied().unwrap_or(0.0),
                    read.get(&self.cfg.face.pitch_joint).copied().unwrap_or(0.0),
                )
            }
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// One frame of the scheduler. Normally driven by the engine task
    /// at `1/fps`; tests call it directly.
    pub fn tick(&self) {
        self.tick_at(Instant::now());
    }

    /// Tick with an explicit clock, so modifier output is
    /// deterministic under test.
    pub fn tick_at(&self, now: Instant) {
        let s = &self.shared;
        // 1. An external owner holds the bus this tick.
        if s.manual_override.load(Ordering::SeqCst) {
            return;
        }
        // 2. Compliant hold: re-issue the present pose as the goal.
        if s.pushable.load(Ordering::SeqCst) {
            self.hold_compliant();
            return;
        }
        // 3. Sleep blocks everything not on the allow-list.
        if s.sleep.load(Ordering::SeqCst) && !self.sleep_exempt() {
            self.abort_playback();
            self.release_torque_if_requested();
            return;
        }
        // Adopt any staged play before deciding what governs the tick.
        if let Some(staged) = s.staged.lock().unwrap().take() {
            let mut pb = s.playback.lock().unwrap();
            if pb.current.is_empty() {
                if let Some(start) = staged.start {
                    pb.current = start;
                }
            }
            info!(name = %staged.recording.name, "starting playback");
            Self::begin_interpolation(&self.cfg, &mut pb, staged.recording);
        }

        let playing = s.playback.lock().unwrap().active.is_some();
        if !playing {
            // 4. Track a face when nothing is playing.
            if s.face_tracking.load(Ordering::SeqCst) {
                self.face_step();
                return;
            }
            // 5. Idle, but alive: modifiers over the last known pose.
            if s.modifiers.lock().unwrap().any_enabled() {
                let base = s.playback.lock().unwrap().current.clone();
                if base.is_empty() {
                    return;
                }
                let mut action = base;
                s.modifiers.lock().unwrap().apply(&mut action, now);
                self.write_action(&action);
            }
            return;
        }
        // 6. Advance playback.
        self.advance_playback(now);
    }

    /// Whether the current tick may keep animating during sleep: the
    /// active or staged recording is on the allow-list. A play staged
    /// before sleep engaged gets re-checked here, not grandfathered.
    fn sleep_exempt(&self) -> bool {
        if let Some(staged) = self.shared.staged.lock().unwrap().as_ref() {
            return SLEEP_ALLOWED.contains(&staged.recording.name.as_str());
        }
        let pb = self.shared.playback.lock().unwrap();
        pb.active
            .as_ref()
            .is_some_and(|r| SLEEP_ALLOWED.contains(&r.name.as_str()))
    }

    fn abort_playback(&self) {
        self.shared.staged.lock().unwrap().take();
        let mut pb = self.shared.playback.lock().unwrap();
        if pb.active.is_some() {
            debug!("aborting playback for sleep");
        }
        pb.clear_active();
    }

    fn release_torque_if_requested(&self) {
        let s = &self.shared;
        if !s.release_on_sleep.load(Ordering::SeqCst) {
            return;
        }
        if s.torque_released.swap(true, Ordering::SeqCst) {
            return;
        }
        let Ok(bus) = self.bus.try_lock() else {
            // Bus busy, retry on a later tick.
            s.torque_released.store(false, Ordering::SeqCst);
            return;
        };
        match bus.disable_torque() {
            Ok(()) => info!("torque released for sleep"),
            Err(e) => {
                warn!(error = %e, "torque release failed");
                s.torque_released.store(false, Ordering::SeqCst);
            }
        }
    }

    fn hold_compliant(&self) {
        let Ok(bus) = self.bus.try_lock() else {
            debug!("bus busy during pushable hold, skipping tick");
            return;
        };
        match bus.sync_read(Register::PresentPosition) {
            Ok(present) => {
                if let Err(e) = bus.sync_write(Register::GoalPosition, &present) {
                    warn!(error = %e, "pushable hold write failed");
                    return;
                }
                drop(bus);
                // The human moved us; adopt their pose as the base.
                self.shared.playback.lock().unwrap().current = present;
            }
            Err(e) => warn!(error = %e, "pushable hold read failed"),
        }
    }

    fn face_step(&self) {
        let gaze = *self.shared.gaze.lock().unwrap();
        let update = self.shared.face.lock().unwrap().step(gaze);
        let Some((yaw, pitch)) = update else {
            return;
        };
        let mut goal = HashMap::new();
        goal.insert(self.cfg.face.yaw_joint.clone(), yaw);
        goal.insert(self.cfg.face.pitch_joint.clone(), pitch);
        if self.write_action(&goal) {
            let mut pb = self.shared.playback.lock().unwrap();
            pb.current.insert(self.cfg.face.yaw_joint.clone(), yaw);
            pb.current.insert(self.cfg.face.pitch_joint.clone(), pitch);
        }
    }

    fn begin_interpolation(cfg: &EngineConfig, pb: &mut Playback, recording: Arc<Recording>) {
        let total = ((cfg.interp_duration * cfg.fps).round() as usize).max(1);
        pb.interp_total = total;
        pb.interp_remaining = total;
        pb.interp_start = pb.current.clone();
        pb.interp_target = recording.frames.first().cloned();
        pb.frame_index = 0;
        pb.active = Some(recording);
    }

    fn advance_playback(&self, now: Instant) {
        // Claim the bus before consuming any playback state: a
        // contended or disconnected tick defers the frame instead of
        // losing it.
        let Ok(bus) = self.bus.try_lock() else {
            debug!("bus busy, deferring playback frame");
            return;
        };
        if !bus.is_connected() {
            debug!("bus disconnected, deferring playback frame");
            return;
        }
        let mut pb = self.shared.playback.lock().unwrap();
        let frame: Frame;
        if pb.interp_remaining > 0 {
            pb.interp_remaining -= 1;
            let progress =
                (1.0 - pb.interp_remaining as f64 / pb.interp_total as f64).clamp(0.0, 1.0);
            let target = pb.interp_target.clone().unwrap_or_default();
            let mut blended = Frame::new();
            for (joint, &goal) in &target {
                let from = pb.interp_start.get(joint).copied().unwrap_or(goal);
                blended.insert(joint.clone(), from + (goal - from) * progress);
            }
            if pb.interp_remaining == 0 {
                // The final step lands exactly on the recording's
                // first frame; continue from its second.
                pb.interp_target = None;
                pb.frame_index = 1;
            }
            frame = blended;
        } else {
            let Some(recording) = pb.active.clone() else {
                return;
            };
            if pb.frame_index >= recording.frames.len() {
                drop(pb);
                self.finish_recording(&recording.name);
                return;
            }
            frame = recording.frames[pb.frame_index].clone();
            pb.frame_index += 1;
        }
        pb.current = frame.clone();
        drop(pb);
        let mut action = frame;
        self.shared.modifiers.lock().unwrap().apply(&mut action, now);
        Self::write_locked(&*bus, &action);
    }

    fn finish_recording(&self, finished: &str) {
        let is_idle = finished == self.cfg.idle_recording;
        if self.shared.dance.load(Ordering::SeqCst) {
            if let Some(energy) = self.music.as_ref().map(|m| m.energy()) {
                if energy >= self.cfg.dance.dance_threshold {
                    if let Some(next) = self.pick_dance(energy) {
                        match self.store.get(&next) {
                            Ok(recording) => {
                                debug!(name = %next, energy, "chaining dance animation");
                                let mut pb = self.shared.playback.lock().unwrap();
                                pb.clear_active();
                                pb.active = Some(recording);
                                return;
                            }
                            Err(e) => warn!(name = %next, error = %e, "dance pick unavailable"),
                        }
                    }
                }
            }
        }
        let mut pb = self.shared.playback.lock().unwrap();
        if is_idle {
            pb.frame_index = 0;
            return;
        }
        match self.store.get(&self.cfg.idle_recording) {
            Ok(idle) => Self::begin_interpolation(&self.cfg, &mut pb, idle),
            Err(e) => {
                warn!(error = %e, "idle recording unavailable, stopping");
                pb.clear_active();
            }
        }
    }

    /// Pick the next clip for the current energy regime, avoiding an
    /// immediate repeat whenever the pool allows it.
    fn pick_dance(&self, energy: f32) -> Option<String> {
        let cfg = &self.cfg.dance;
        let pool = if energy >= cfg.excited_threshold {
            &cfg.excited_pool
        } else {
            &cfg.groove_pool
        };
        if pool.is_empty() {
            return None;
        }
        let mut last = self.shared.last_dance.lock().unwrap();
        let candidates: Vec<&String> = if pool.len() >= 2 {
            pool.iter()
                .filter(|name| Some(name.as_str()) != last.as_deref())
                .collect()
        } else {
            pool.iter().collect()
        };
        let pick = {
            let mut rng = self.shared.rng.lock().unwrap();
            candidates[rng.gen_range(0..candidates.len())].clone()
        };
        *last = Some(pick.clone());
        Some(pick)
    }

    /// Non-blocking bus write. Returns `false` when the frame was
    /// dropped, which is not an error: either another producer holds
    /// the bus this tick, or the hardware is briefly unhappy.
    fn write_action(&self, goal: &HashMap<String, f64>) -> bool {
        let Ok(bus) = self.bus.try_lock() else {
            debug!("bus busy, skipping frame");
            return false;
        };
        Self::write_locked(&*bus, goal)
    }

    fn write_locked(bus: &dyn MotorBus, goal: &HashMap<String, f64>) -> bool {
        if !bus.is_connected() {
            debug!("bus disconnected, skipping frame");
            return false;
        }
        let action: HashMap<String, f64> = goal
            .iter()
            .map(|(joint, &angle)| (format!("{joint}.pos"), angle))
            .collect();
        match bus.send_action(&action) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "bus write failed");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Scheduler task
    // ------------------------------------------------------------------

    /// Spawn the fixed-rate tick task. Repeated calls while running
    /// are no-ops.
    pub fn start(&self) {
        let mut task = self.shared.task.lock().unwrap();
        if task.is_some() {
            return;
        }
        self.shared.shutdown.store(false, Ordering::SeqCst);
        let engine = self.clone();
        let period = Duration::from_secs_f64(1.0 / self.cfg.fps);
        *task = Some(tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if engine.shared.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                engine.tick();
            }
        }));
        info!(fps = self.cfg.fps, "animation engine started");
    }

    /// Stop the tick task, joining with a bound and logging rather
    /// than hanging if it is exceeded.
    pub async fn stop(&self, timeout: Duration) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        let handle = self.shared.task.lock().unwrap().take();
        if let Some(handle) = handle {
            match time::timeout(timeout, handle).await {
                Ok(Ok(())) => info!("animation engine stopped"),
                Ok(Err(e)) => warn!(error = %e, "engine tick task panicked"),
                Err(_) => warn!(?timeout, "engine tick task did not stop in time"),
            }
        }
    }
}
