use clap::Parser;
use lumen::{FixedTempo, JOINTS, SimulatedBus, init_logging, seed_demo_recordings};
use motion::{
    AnimationEngine, EngineCommand, EngineCommandHandler, EngineConfig, EventSlot, RecordingStore,
    SharedBus, default_stack,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Directory of built-in recordings
    #[arg(long, env = "LUMEN_RECORDINGS", default_value = "recordings")]
    recordings_dir: PathBuf,

    /// Directory of user recordings, checked before the built-ins
    #[arg(long, env = "LUMEN_USER_RECORDINGS")]
    user_recordings_dir: Option<PathBuf>,

    /// Engine tick rate
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Tempo of the simulated music source
    #[arg(long, default_value_t = 96.0)]
    bpm: f32,

    /// Start with dance mode enabled
    #[arg(long)]
    dance: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let cfg = EngineConfig {
        fps: cli.fps,
        ..EngineConfig::default()
    };

    let store = Arc::new(RecordingStore::new(
        cli.recordings_dir,
        cli.user_recordings_dir,
    ));
    seed_demo_recordings(&store, cfg.fps);

    let bus: SharedBus = Arc::new(Mutex::new(SimulatedBus::with_joints(JOINTS)));
    let music = Arc::new(FixedTempo::new(cli.bpm, 0.7));

    let engine = AnimationEngine::new(bus, store, cfg)?.with_music(music.clone());
    let joints: Vec<String> = JOINTS.iter().map(|j| (*j).to_string()).collect();
    for entry in default_stack(&joints, Some(music)).into_entries() {
        engine.register_modifier(entry);
    }
    engine.enable_modifier("breathing");
    engine.enable_modifier("sway");
    if cli.dance {
        engine.set_dance_mode(true);
        engine.enable_modifier("music");
    }
    engine.start();

    let commands: EventSlot<EngineCommand> = EventSlot::new();
    commands.start(Arc::new(EngineCommandHandler::new(engine.clone())));
    commands.dispatch(
        "play",
        EngineCommand::Play {
            name: "idle".into(),
        },
        0,
    );

    info!("lumen running, ctrl-c to exit");
    tokio::signal::ctrl_c().await?;

    commands.stop(Duration::from_secs(2)).await;
    engine.stop(Duration::from_secs(2)).await;
    Ok(())
}
