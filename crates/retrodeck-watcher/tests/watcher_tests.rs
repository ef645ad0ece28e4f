//! Watcher behaviour over scripted process snapshots

use async_trait::async_trait;
use retrodeck_catalog::{CatalogIndex, GameRecord};
use retrodeck_config::WatcherConfig;
use retrodeck_controls::{
    ControlResolver, ControlsError, GeneratedCache, OverrideStore, PositionKey, TextGenerator,
};
use retrodeck_emulator::{DetectedProcess, EmulatorError, EmulatorKind, ProcessQuery};
use retrodeck_watcher::{CompanionState, GameResolver, GameWatcher};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{Notify, broadcast};

const MARIO_CMD: &str = r#"retroarch.exe -L "cores\mupen64plus_next_libretro.dll" -f "C:\LaunchBox\Games\Nintendo 64\Super Mario 64 (USA).z64""#;
const UNKNOWN_CMD: &str = r#"retroarch.exe -L "cores\snes9x_libretro.dll" "D:\Homebrew\Demo.sfc""#;

/// Process list the test changes between ticks; `None` makes the query fail
struct ScriptedQuery {
    current: Mutex<Option<Vec<DetectedProcess>>>,
    delay: Duration,
}

impl ScriptedQuery {
    fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(Some(Vec::new())),
            delay,
        })
    }

    fn running(&self, name: &str, command_line: &str) {
        *self.current.lock().unwrap() = Some(vec![DetectedProcess::new(name, command_line)]);
    }

    fn nothing(&self) {
        *self.current.lock().unwrap() = Some(Vec::new());
    }

    fn failing(&self) {
        *self.current.lock().unwrap() = None;
    }
}

#[async_trait]
impl ProcessQuery for ScriptedQuery {
    async fn query(&self, _: &[EmulatorKind]) -> Result<Vec<DetectedProcess>, EmulatorError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let current = self.current.lock().unwrap().clone();
        current.ok_or_else(|| EmulatorError::QueryFailed("scripted".into()))
    }
}

/// Generator that waits for the test to release it
struct GatedGenerator {
    gate: Notify,
}

#[async_trait]
impl TextGenerator for GatedGenerator {
    async fn generate(&self, _: &str) -> Result<String, ControlsError> {
        self.gate.notified().await;
        Ok(r#"{"faceBottom": "Jump", "faceLeft": "Punch"}"#.to_string())
    }
}

struct TestEnv {
    dir: TempDir,
    query: Arc<ScriptedQuery>,
}

impl TestEnv {
    fn new() -> Self {
        Self::with_query(ScriptedQuery::new())
    }

    fn with_query(query: Arc<ScriptedQuery>) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            query,
        }
    }

    fn games(&self) -> GameResolver {
        let mario = GameRecord {
            id: "n64-1".into(),
            title: "Super Mario 64".into(),
            platform: "Nintendo 64".into(),
            application_path: r"Games\Nintendo 64\Super Mario 64 (USA).z64".into(),
            ..Default::default()
        };
        GameResolver::new(Arc::new(CatalogIndex::from_records(r"C:\LaunchBox", [mario])))
    }

    fn resolver(&self) -> ControlResolver {
        ControlResolver::new(
            OverrideStore::new(self.dir.path().join("overrides.json")),
            GeneratedCache::new(self.cache_path(), 2),
        )
    }

    fn cache_path(&self) -> std::path::PathBuf {
        self.dir.path().join("game-controls.json")
    }

    fn watcher(&self) -> GameWatcher {
        GameWatcher::new(self.query.clone(), self.games())
    }
}

/// Next published state, failing the test if none arrives
async fn next_state(rx: &mut broadcast::Receiver<CompanionState>) -> CompanionState {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no state published")
        .unwrap()
}

async fn wait_for_file(path: &Path) {
    for _ in 0..200 {
        if path.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never appeared", path.display());
}

#[tokio::test]
async fn test_detects_cataloged_game() {
    let env = TestEnv::new();
    let watcher = env.watcher();
    let mut rx = watcher.subscribe();

    env.query.running("retroarch.exe", MARIO_CMD);
    watcher.poll_once().await;

    let state = next_state(&mut rx).await;
    let game = state.game().unwrap();
    assert_eq!(game.title, "Super Mario 64");
    assert!(game.is_cataloged());
    assert_eq!(state.emulator_process(), Some("retroarch.exe"));
    assert_eq!(watcher.active_emulator_process().as_deref(), Some("retroarch.exe"));
}

#[tokio::test]
async fn test_unknown_rom_gets_placeholder() {
    let env = TestEnv::new();
    let watcher = env.watcher();

    env.query.running("retroarch.exe", UNKNOWN_CMD);
    watcher.poll_once().await;

    let state = watcher.current_state();
    let game = state.game().unwrap();
    assert_eq!(game.title, "Demo");
    assert_eq!(game.platform, "Unknown");
    assert!(!game.is_cataloged());
}

#[tokio::test]
async fn test_repeated_detection_is_silent() {
    let env = TestEnv::new();
    let watcher = env.watcher();
    let mut rx = watcher.subscribe();

    env.query.running("retroarch.exe", MARIO_CMD);
    for _ in 0..4 {
        watcher.poll_once().await;
    }

    assert!(next_state(&mut rx).await.is_game_active());
    assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
}

#[tokio::test]
async fn test_single_idle_emission() {
    let env = TestEnv::new();
    let watcher = env.watcher();
    let mut rx = watcher.subscribe();

    // Nothing running while idle: no events at all
    watcher.poll_once().await;
    assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));

    env.query.running("retroarch.exe", MARIO_CMD);
    watcher.poll_once().await;
    assert!(next_state(&mut rx).await.is_game_active());

    env.query.nothing();
    watcher.poll_once().await;
    env.query.failing();
    watcher.poll_once().await;
    env.query.nothing();
    watcher.poll_once().await;

    assert_eq!(next_state(&mut rx).await, CompanionState::Idle);
    assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
    assert_eq!(watcher.active_emulator_process(), None);
}

#[tokio::test]
async fn test_query_timeout_counts_as_nothing() {
    let env = TestEnv::with_query(ScriptedQuery::with_delay(Duration::from_millis(300)));
    let watcher = env.watcher().with_config(&WatcherConfig {
        query_timeout_ms: 50,
        ..WatcherConfig::default()
    });

    watcher.set_state(CompanionState::game_active(
        GameRecord::unknown("zelda.nes"),
        "retroarch.exe",
    ));
    env.query.running("retroarch.exe", MARIO_CMD);
    watcher.poll_once().await;

    assert!(watcher.current_state().is_idle());
}

#[tokio::test]
async fn test_controller_map_attached() {
    let env = TestEnv::new();
    env.resolver()
        .save_override("Super Mario 64", PositionKey::FaceBottom, "Jump")
        .unwrap();

    let watcher = env.watcher().with_controls(Arc::new(env.resolver()));
    let mut rx = watcher.subscribe();

    env.query.running("retroarch.exe", MARIO_CMD);
    watcher.poll_once().await;

    let first = next_state(&mut rx).await;
    assert!(first.is_game_active());
    assert!(first.controller_map().is_none());

    let second = next_state(&mut rx).await;
    assert_eq!(second.game(), first.game());
    assert_eq!(
        second.controller_map().unwrap().get(PositionKey::FaceBottom),
        Some("Jump")
    );
    assert_eq!(watcher.current_state(), second);
}

#[tokio::test]
async fn test_stale_controller_map_discarded() {
    let env = TestEnv::new();
    let generator = Arc::new(GatedGenerator {
        gate: Notify::new(),
    });
    let controls = env.resolver().with_generator(generator.clone());
    let watcher = env.watcher().with_controls(Arc::new(controls));
    let mut rx = watcher.subscribe();

    env.query.running("retroarch.exe", MARIO_CMD);
    watcher.poll_once().await;
    assert!(next_state(&mut rx).await.is_game_active());

    // Game closes while generation is still in flight
    env.query.nothing();
    watcher.poll_once().await;
    assert_eq!(next_state(&mut rx).await, CompanionState::Idle);

    generator.gate.notify_one();
    wait_for_file(&env.cache_path()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Generated map was cached but never resurrected the closed game
    assert!(watcher.current_state().is_idle());
    assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
}

#[tokio::test]
async fn test_set_state_forgets_path() {
    let env = TestEnv::new();
    let watcher = env.watcher();

    env.query.running("retroarch.exe", MARIO_CMD);
    watcher.poll_once().await;

    watcher.set_state(CompanionState::Idle);
    let mut rx = watcher.subscribe();

    // Still running, so it is reported again
    watcher.poll_once().await;
    assert!(next_state(&mut rx).await.is_game_active());
}

#[tokio::test]
async fn test_start_polls_immediately() {
    let env = TestEnv::new();
    env.query.running("retroarch.exe", MARIO_CMD);

    let watcher = Arc::new(env.watcher().with_config(&WatcherConfig {
        poll_interval_ms: 20,
        ..WatcherConfig::default()
    }));
    let mut rx = watcher.subscribe();

    watcher.start();
    assert!(next_state(&mut rx).await.is_game_active());

    env.query.nothing();
    assert_eq!(next_state(&mut rx).await, CompanionState::Idle);

    watcher.stop().await;
    env.query.running("retroarch.exe", MARIO_CMD);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(watcher.current_state().is_idle());
}
