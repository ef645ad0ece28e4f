//! Polling service that keeps the companion state current

use crate::detector::{Detection, Detector, PollOutcome};
use crate::reconcile::GameResolver;
use crate::state::CompanionState;
use retrodeck_catalog::GameRecord;
use retrodeck_config::WatcherConfig;
use retrodeck_controls::ControlResolver;
use retrodeck_emulator::{EmulatorKind, ProcessQuery};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// State guarded together so transitions and staleness checks agree
#[derive(Debug, Default)]
struct Shared {
    state: CompanionState,
    detector: Detector,
    /// Bumped on every transition; background work started under an older
    /// epoch is discarded
    epoch: u64,
}

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Watches for running emulators and broadcasts [`CompanionState`] changes
pub struct GameWatcher {
    query: Arc<dyn ProcessQuery>,
    games: GameResolver,
    controls: Option<Arc<ControlResolver>>,
    targets: Vec<EmulatorKind>,
    poll_interval: Duration,
    query_timeout: Duration,
    shared: Arc<Mutex<Shared>>,
    events: broadcast::Sender<CompanionState>,
    running: Mutex<Option<Running>>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Replace the state wholesale and notify subscribers
fn publish(
    shared: &mut Shared,
    events: &broadcast::Sender<CompanionState>,
    state: CompanionState,
) {
    shared.state = state.clone();
    // No subscribers is fine
    let _ = events.send(state);
}

impl GameWatcher {
    pub fn new(query: Arc<dyn ProcessQuery>, games: GameResolver) -> Self {
        let config = WatcherConfig::default();
        let (events, _) = broadcast::channel(config.event_capacity);

        Self {
            query,
            games,
            controls: None,
            targets: EmulatorKind::ALL.to_vec(),
            poll_interval: config.poll_interval(),
            query_timeout: config.query_timeout(),
            shared: Arc::new(Mutex::new(Shared::default())),
            events,
            running: Mutex::new(None),
        }
    }

    /// Apply timings and channel capacity. Call before subscribing.
    pub fn with_config(mut self, config: &WatcherConfig) -> Self {
        self.poll_interval = config.poll_interval();
        self.query_timeout = config.query_timeout();
        self.events = broadcast::channel(config.event_capacity.max(1)).0;
        self
    }

    pub fn with_controls(mut self, controls: Arc<ControlResolver>) -> Self {
        self.controls = Some(controls);
        self
    }

    /// Restrict detection to some emulators
    pub fn with_targets(mut self, targets: &[EmulatorKind]) -> Self {
        self.targets = targets.to_vec();
        self
    }

    /// Receive every state published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<CompanionState> {
        self.events.subscribe()
    }

    pub fn current_state(&self) -> CompanionState {
        lock(&self.shared).state.clone()
    }

    /// Process name of the emulator running the current game
    pub fn active_emulator_process(&self) -> Option<String> {
        lock(&self.shared)
            .state
            .emulator_process()
            .map(str::to_string)
    }

    /// Externally driven transition (e.g. a failed launch, or simulation).
    ///
    /// The detector forgets the last ROM path, so a game still running is
    /// reported afresh on the next tick.
    pub fn set_state(&self, state: CompanionState) {
        let mut shared = lock(&self.shared);
        shared.detector.reset(state.is_game_active());
        shared.epoch += 1;
        tracing::info!("State set externally: {}", state_name(&state));
        publish(&mut shared, &self.events, state);
    }

    /// Poll immediately, then every interval until [`Self::stop`].
    ///
    /// Ticks never overlap: the next sleep starts after the previous tick
    /// finished.
    pub fn start(self: &Arc<Self>) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            return;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let watcher = Arc::clone(self);

        let handle = tokio::spawn(async move {
            tracing::info!(
                "Game watcher started (every {:?}, query timeout {:?})",
                watcher.poll_interval,
                watcher.query_timeout
            );

            loop {
                watcher.poll_once().await;

                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = tokio::time::sleep(watcher.poll_interval) => {}
                }
            }

            tracing::info!("Game watcher stopped");
        });

        *running = Some(Running { shutdown, handle });
    }

    /// Stop polling. A tick in progress finishes; none start afterwards.
    /// Background controller-map resolutions are left to complete and are
    /// discarded if stale.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(Running { shutdown, handle }) = running {
            let _ = shutdown.send(true);
            if let Err(e) = handle.await {
                tracing::warn!("Watcher task ended abnormally: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Run exactly one detection tick
    pub async fn poll_once(&self) {
        let outcome = match tokio::time::timeout(self.query_timeout, self.query.query(&self.targets))
            .await
        {
            Ok(Ok(processes)) => PollOutcome::Processes(processes),
            Ok(Err(e)) => {
                tracing::debug!("Process query failed: {}", e);
                PollOutcome::Failed
            }
            Err(_) => {
                tracing::warn!("Process query timed out after {:?}", self.query_timeout);
                PollOutcome::Failed
            }
        };

        let (rom_path, process_name, epoch) = {
            let mut shared = lock(&self.shared);
            match shared.detector.observe(outcome) {
                None => return,
                Some(Detection::Stopped) => {
                    shared.epoch += 1;
                    tracing::info!("Game closed");
                    publish(&mut shared, &self.events, CompanionState::Idle);
                    return;
                }
                Some(Detection::Started {
                    rom_path,
                    process_name,
                }) => (rom_path, process_name, shared.epoch),
            }
        };

        let game = self.games.resolve(&rom_path).await;

        let epoch = {
            let mut shared = lock(&self.shared);
            if shared.epoch != epoch {
                tracing::debug!("State changed while resolving {}, dropping", rom_path);
                return;
            }
            shared.epoch += 1;
            publish(
                &mut shared,
                &self.events,
                CompanionState::game_active(game.clone(), process_name),
            );
            shared.epoch
        };

        self.spawn_controller_map(game, epoch);
    }

    /// Resolve the controller map in the background and attach it if the
    /// same game is still the current state
    fn spawn_controller_map(&self, game: GameRecord, epoch: u64) {
        let Some(controls) = self.controls.clone() else {
            return;
        };
        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();

        tokio::spawn(async move {
            let Some(map) = controls.resolve(&game.title, &game.platform).await else {
                return;
            };

            let mut shared = lock(&shared);
            if shared.epoch != epoch || !shared.state.is_game_active() {
                tracing::debug!("Discarding stale controller map for \"{}\"", game.title);
                return;
            }

            let next = shared.state.clone().with_controller_map(map);
            publish(&mut shared, &events, next);
        });
    }
}

fn state_name(state: &CompanionState) -> &'static str {
    match state {
        CompanionState::Idle => "idle",
        CompanionState::GameActive { .. } => "game-active",
        CompanionState::Error { .. } => "error",
    }
}
