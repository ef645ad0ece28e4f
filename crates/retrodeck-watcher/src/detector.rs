//! Edge-triggered game detection
//!
//! Pure transition logic: one process snapshot in, at most one transition
//! out. Timers and the OS query live in the watcher service.

use retrodeck_emulator::{DetectedProcess, EmulatorKind};

/// Result of one process query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Query failed or timed out; handled exactly like finding nothing
    Failed,
    Processes(Vec<DetectedProcess>),
}

/// A transition the watcher has to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// A ROM different from the last one is running
    Started {
        rom_path: String,
        process_name: String,
    },
    /// The running game went away
    Stopped,
}

#[derive(Debug, Default)]
pub struct Detector {
    current_path: Option<String>,
    active: bool,
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one tick's snapshot
    pub fn observe(&mut self, outcome: PollOutcome) -> Option<Detection> {
        let processes = match outcome {
            PollOutcome::Processes(processes) if !processes.is_empty() => processes,
            _ => return self.observe_nothing(),
        };

        // Only the first match is considered
        let process = &processes[0];
        let Some(kind) = EmulatorKind::from_process_name(&process.name) else {
            tracing::debug!("No parser registered for {}, ignoring tick", process.name);
            return None;
        };

        let Some(rom_path) = kind.extract_rom_path(&process.command_line) else {
            tracing::debug!("No ROM path in {} command line, ignoring tick", process.name);
            return None;
        };

        if self.current_path.as_deref() == Some(rom_path.as_str()) {
            return None;
        }

        tracing::info!("{} is running {}", kind.display_name(), rom_path);
        self.current_path = Some(rom_path.clone());
        self.active = true;

        Some(Detection::Started {
            rom_path,
            process_name: process.name.clone(),
        })
    }

    fn observe_nothing(&mut self) -> Option<Detection> {
        if !self.active {
            return None;
        }

        self.current_path = None;
        self.active = false;
        Some(Detection::Stopped)
    }

    /// Realign after an externally set state. The remembered path is
    /// forgotten so the next sighting of a game is reported again.
    pub fn reset(&mut self, active: bool) {
        self.current_path = None;
        self.active = active;
    }

    pub fn current_path(&self) -> Option<&str> {
        self.current_path.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
