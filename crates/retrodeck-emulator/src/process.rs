//! OS process queries for running emulators

use crate::{EmulatorError, EmulatorKind};
use async_trait::async_trait;
use std::ffi::OsString;
use std::sync::Arc;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

/// A running process matching one of the requested emulators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedProcess {
    pub name: String,
    pub command_line: String,
}

impl DetectedProcess {
    pub fn new(name: impl Into<String>, command_line: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command_line: command_line.into(),
        }
    }
}

/// Source of running-process snapshots.
///
/// Implementations only report; callers bound each query with their own
/// timeout and treat failures the same as finding nothing.
#[async_trait]
pub trait ProcessQuery: Send + Sync {
    async fn query(&self, targets: &[EmulatorKind]) -> Result<Vec<DetectedProcess>, EmulatorError>;
}

/// `where` clause covering every target
pub fn wmic_filter(targets: &[EmulatorKind]) -> String {
    targets
        .iter()
        .map(|kind| kind.wmic_filter())
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Parse `wmic ... get Name,CommandLine /format:list` output.
///
/// Records are blank-line separated `Key=Value` blocks. Blocks missing
/// either value (e.g. processes we may not inspect) are dropped.
pub fn parse_wmic_output(stdout: &str) -> Vec<DetectedProcess> {
    let mut results = Vec::new();
    let mut name: Option<String> = None;
    let mut command_line: Option<String> = None;

    let mut flush = |name: &mut Option<String>, command_line: &mut Option<String>| {
        if let (Some(n), Some(c)) = (name.take(), command_line.take()) {
            results.push(DetectedProcess::new(n, c));
        }
    };

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut name, &mut command_line);
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        if key.eq_ignore_ascii_case("CommandLine") {
            command_line = Some(value.to_string());
        } else if key.eq_ignore_ascii_case("Name") {
            name = Some(value.to_string());
        }
    }
    flush(&mut name, &mut command_line);

    results
}

/// Windows Management Instrumentation via the `wmic` command
#[derive(Debug, Default, Clone, Copy)]
pub struct WmicProcessQuery;

#[async_trait]
impl ProcessQuery for WmicProcessQuery {
    async fn query(&self, targets: &[EmulatorKind]) -> Result<Vec<DetectedProcess>, EmulatorError> {
        let filter = wmic_filter(targets);

        let output = tokio::process::Command::new("wmic")
            .args([
                "process",
                "where",
                filter.as_str(),
                "get",
                "Name,CommandLine",
                "/format:list",
            ])
            .kill_on_drop(true)
            .output()
            .await?;

        // wmic exits non-zero with "No Instance(s) Available." when nothing matches
        if !output.status.success() {
            return Err(EmulatorError::QueryFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(parse_wmic_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Portable process listing through `sysinfo`
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoProcessQuery;

/// Rebuild a command line from argv, quoting arguments with whitespace
fn join_command_line(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| {
            let arg = arg.to_string_lossy();
            if arg.chars().any(char::is_whitespace) {
                format!("\"{}\"", arg)
            } else {
                arg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Order `(start_time, pid, process)` entries by start time. Processes
/// started in the same second fall back to pid order.
fn oldest_first(mut found: Vec<(u64, u32, DetectedProcess)>) -> Vec<DetectedProcess> {
    found.sort_by_key(|(started, pid, _)| (*started, *pid));
    found.into_iter().map(|(_, _, process)| process).collect()
}

#[async_trait]
impl ProcessQuery for SysinfoProcessQuery {
    async fn query(&self, targets: &[EmulatorKind]) -> Result<Vec<DetectedProcess>, EmulatorError> {
        let targets = targets.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut system = System::new();
            system.refresh_processes_specifics(
                ProcessesToUpdate::All,
                true,
                ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
            );

            let found: Vec<(u64, u32, DetectedProcess)> = system
                .processes()
                .iter()
                .filter_map(|(pid, process)| {
                    let name = process.name().to_string_lossy().to_string();
                    if !targets.iter().any(|kind| kind.matches_process(&name)) {
                        return None;
                    }
                    let command_line = join_command_line(process.cmd());
                    Some((
                        process.start_time(),
                        pid.as_u32(),
                        DetectedProcess::new(name, command_line),
                    ))
                })
                .collect();

            oldest_first(found)
        })
        .await
        .map_err(|e| EmulatorError::QueryFailed(e.to_string()))
    }
}

/// WMIC on Windows, sysinfo elsewhere
pub fn default_process_query() -> Arc<dyn ProcessQuery> {
    if cfg!(windows) {
        Arc::new(WmicProcessQuery)
    } else {
        Arc::new(SysinfoProcessQuery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WMIC_OUTPUT: &str = "\r\r\n\r\r\nCommandLine=\"C:\\RetroArch\\retroarch.exe\" -L \"cores\\snes9x_libretro.dll\" \"D:\\SNES\\Zelda.sfc\"\r\r\nName=retroarch.exe\r\r\n\r\r\n\r\r\nCommandLine=Dolphin.exe --exec=\"D:\\iso\\melee.iso\"\r\r\nName=Dolphin.exe\r\r\n\r\r\n\r\r\nCommandLine=\r\r\nName=pcsx2-qt.exe\r\r\n\r\r\n";

    #[test]
    fn test_parse_wmic_output() {
        let processes = parse_wmic_output(WMIC_OUTPUT);
        assert_eq!(processes.len(), 2);

        assert_eq!(processes[0].name, "retroarch.exe");
        assert!(processes[0].command_line.ends_with(r#""D:\SNES\Zelda.sfc""#));

        // '=' inside the value is kept
        assert_eq!(processes[1].command_line, r#"Dolphin.exe --exec="D:\iso\melee.iso""#);
    }

    #[test]
    fn test_parse_wmic_empty() {
        assert!(parse_wmic_output("").is_empty());
        assert!(parse_wmic_output("No Instance(s) Available.\r\n").is_empty());
    }

    #[test]
    fn test_wmic_filter() {
        assert_eq!(
            wmic_filter(&EmulatorKind::ALL),
            "name='retroarch.exe' or name='Dolphin.exe' or name like 'pcsx2%'"
        );
    }

    #[test]
    fn test_oldest_first_uses_start_time() {
        let found = vec![
            (1_700_000_300, 120, DetectedProcess::new("Dolphin.exe", "newer")),
            (1_700_000_100, 9000, DetectedProcess::new("retroarch.exe", "older")),
            (1_700_000_300, 80, DetectedProcess::new("pcsx2-qt.exe", "same second")),
        ];

        let names: Vec<String> = oldest_first(found)
            .into_iter()
            .map(|process| process.name)
            .collect();
        assert_eq!(names, ["retroarch.exe", "pcsx2-qt.exe", "Dolphin.exe"]);
    }

    #[test]
    fn test_join_command_line() {
        let args: Vec<OsString> = vec![
            "retroarch".into(),
            "-L".into(),
            "/usr/lib/libretro/mgba_libretro.so".into(),
            "/roms/gba/Mario Kart.gba".into(),
        ];
        assert_eq!(
            join_command_line(&args),
            r#"retroarch -L /usr/lib/libretro/mgba_libretro.so "/roms/gba/Mario Kart.gba""#
        );
    }

    #[tokio::test]
    async fn test_sysinfo_query_runs() {
        // Nothing emulated in CI; just make sure the query completes
        let result = SysinfoProcessQuery.query(&EmulatorKind::ALL).await;
        assert!(result.is_ok());
    }
}
