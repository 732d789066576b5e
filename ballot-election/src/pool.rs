//! The fixed set of participants of one run and the files they share

use std::fs;
use std::ops::Range;

use crate::config::RunPaths;
use crate::error::{Result, VotingError};
use crate::state::SharedRoundState;
use crate::sync::{ElectionLock, WriteLock};

/// A pool of `n_procs` participants with ids `0..n_procs`.
///
/// Created once by whoever starts the participants, before any of them runs.
#[derive(Debug, Clone)]
pub struct ParticipantPool {
    n_procs: usize,
    paths: RunPaths,
}

impl ParticipantPool {
    /// Create the run directory, both lock files and a zeroed state region
    pub fn create(paths: RunPaths, n_procs: usize) -> Result<Self> {
        if n_procs == 0 {
            return Err(VotingError::Config(
                "a pool needs at least one participant".to_string(),
            ));
        }

        fs::create_dir_all(paths.dir()).map_err(|e| VotingError::creation(paths.dir(), e))?;
        ElectionLock::open(paths.election_lock())?;
        WriteLock::open(paths.write_lock())?;
        SharedRoundState::create(paths.state(), n_procs)?;

        tracing::info!(dir = %paths.dir().display(), n_procs, "participant pool created");
        Ok(Self { n_procs, paths })
    }

    pub fn n_procs(&self) -> usize {
        self.n_procs
    }

    pub fn ids(&self) -> Range<usize> {
        0..self.n_procs
    }

    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    /// Delete the run directory. Only call once every participant has exited.
    pub fn remove(self) -> Result<()> {
        fs::remove_dir_all(self.paths.dir())
            .map_err(|e| VotingError::operation("remove run directory", e))?;
        tracing::debug!(dir = %self.paths.dir().display(), "participant pool removed");
        Ok(())
    }
}
