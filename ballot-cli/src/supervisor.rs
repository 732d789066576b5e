//! Forks the participants, starts them, and stops them after the deadline.

use std::fmt;
use std::io;
use std::process;
use std::time::Duration;

use anyhow::{bail, Context};
use ballot_election::{
    pause, run_voter_process, ElectionConfig, ParticipantPool, ProcessSignals, START_SIGNAL,
    STOP_SIGNAL,
};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};

use crate::cli::Cli;
use crate::exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use crate::report::ConsoleReporter;

const DEADLINE_POLL: Duration = Duration::from_millis(10);

/// Why the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    /// The requested run time elapsed
    Alarm,
    /// The supervisor itself was interrupted
    Signal,
}

impl fmt::Display for Finish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finish::Alarm => write!(f, "Finishing by alarm"),
            Finish::Signal => write!(f, "Finishing by signal"),
        }
    }
}

/// Build the election settings: defaults, then the config file, then flags
pub fn load_config(cli: &Cli) -> anyhow::Result<ElectionConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            ElectionConfig::from_toml_str(&content)
                .with_context(|| format!("invalid config file '{}'", path.display()))?
        }
        None => ElectionConfig::new(),
    };

    if let Some(dir) = &cli.base_dir {
        config = config.with_base_dir(dir);
    }
    if let Some(pause_ms) = cli.round_pause_ms {
        config.round_pause_ms = pause_ms;
    }
    config.validate()?;
    Ok(config)
}

/// Run the whole pool for `cli.n_secs` seconds
pub fn run(cli: &Cli) -> anyhow::Result<Finish> {
    let config = load_config(cli)?;
    let pool = ParticipantPool::create(config.run_paths(process::id()), cli.n_procs as usize)
        .context("failed to prepare shared resources")?;
    let signals = ProcessSignals::install().context("failed to install signal handlers")?;

    let children = match spawn_participants(&pool, &config, &signals) {
        Ok(children) => children,
        Err(e) => {
            let _ = pool.remove();
            return Err(e);
        }
    };

    signal_all(&children, START_SIGNAL);
    tracing::info!(n_procs = children.len(), seconds = cli.n_secs, "participants started");

    let finish = if pause(&signals, Duration::from_secs(cli.n_secs), DEADLINE_POLL) {
        Finish::Alarm
    } else {
        Finish::Signal
    };

    signal_all(&children, STOP_SIGNAL);
    let failures = reap(&children);
    println!("{finish}");

    pool.remove().context("failed to remove run directory")?;
    if failures > 0 {
        bail!("{} of {} participants exited with failure", failures, children.len());
    }
    Ok(finish)
}

fn spawn_participants(
    pool: &ParticipantPool,
    config: &ElectionConfig,
    signals: &ProcessSignals,
) -> anyhow::Result<Vec<Pid>> {
    let mut children = Vec::with_capacity(pool.n_procs());
    for id in pool.ids() {
        // SAFETY: the supervisor is single-threaded; the child runs its
        // participant loop and exits without returning to this function.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => process::exit(participant_main(pool, id, config, signals)),
            Ok(ForkResult::Parent { child }) => {
                tracing::debug!(id, pid = %child, "participant forked");
                children.push(child);
            }
            Err(e) => {
                signal_all(&children, STOP_SIGNAL);
                reap(&children);
                return Err(e).with_context(|| format!("failed to fork participant {id}"));
            }
        }
    }
    Ok(children)
}

fn participant_main(
    pool: &ParticipantPool,
    id: usize,
    config: &ElectionConfig,
    signals: &ProcessSignals,
) -> i32 {
    let mut console = ConsoleReporter::new(io::stdout());
    match run_voter_process(pool, id, config, signals, &mut console) {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("participant {id}: {e}");
            EXIT_ERROR
        }
    }
}

fn signal_all(children: &[Pid], signal: Signal) {
    for &pid in children {
        match kill(pid, signal) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => tracing::warn!(%pid, ?signal, "failed to signal participant: {}", e),
        }
    }
}

/// Wait for every child; returns how many did not exit cleanly
fn reap(children: &[Pid]) -> usize {
    let mut failures = 0;
    for &pid in children {
        loop {
            match waitpid(pid, None) {
                Ok(WaitStatus::Exited(_, EXIT_SUCCESS)) => break,
                Ok(WaitStatus::Exited(_, code)) => {
                    tracing::warn!(%pid, code, "participant exited with failure");
                    failures += 1;
                    break;
                }
                Ok(WaitStatus::Signaled(_, signal, _)) => {
                    tracing::warn!(%pid, ?signal, "participant killed by signal");
                    failures += 1;
                    break;
                }
                Ok(_) | Err(Errno::EINTR) => continue,
                Err(e) => {
                    tracing::warn!(%pid, "failed to wait for participant: {}", e);
                    failures += 1;
                    break;
                }
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_finish_display() {
        assert_eq!(Finish::Alarm.to_string(), "Finishing by alarm");
        assert_eq!(Finish::Signal.to_string(), "Finishing by signal");
    }

    #[test]
    fn test_load_config_defaults() {
        let cli = Cli::try_parse_from(["voting", "2", "1"]).unwrap();
        assert_eq!(load_config(&cli).unwrap(), ElectionConfig::new());
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ballot.toml");
        std::fs::write(&path, "prefix = \"poll\"\nround_pause_ms = 500\n").unwrap();

        let cli = Cli::try_parse_from([
            "voting",
            "2",
            "1",
            "--config",
            path.to_str().unwrap(),
            "--round-pause-ms",
            "5",
            "--base-dir",
            "/tmp/elsewhere",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();

        assert_eq!(config.prefix, "poll");
        assert_eq!(config.round_pause_ms, 5);
        assert_eq!(config.base_dir, PathBuf::from("/tmp/elsewhere"));
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli::try_parse_from(["voting", "2", "1", "--config", "/nonexistent/ballot.toml"])
            .unwrap();
        let err = load_config(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config file"));
    }
}
