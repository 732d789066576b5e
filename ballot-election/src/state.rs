//! Round state shared by every participant through a memory-mapped file
//!
//! Layout (little endian):
//!
//! | offset | size | field        |
//! |--------|------|--------------|
//! | 0      | 4    | magic        |
//! | 4      | 4    | n_procs      |
//! | 8      | 8    | round        |
//! | 16     | 4    | votes cast   |
//! | 20     | 4    | reserved     |
//! | 24     | 8*n  | vote records |
//!
//! A vote record is the participant id (4 bytes), the ballot byte and three
//! bytes of padding. Every accessor takes a [`WriteGuard`] so the state can only
//! be touched while the write lock is held.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::ballot::{Ballot, Vote};
use crate::error::{Corruption, Result, VotingError};
use crate::sync::WriteGuard;

const MAGIC: u32 = 0x564f_5445;
const MAGIC_AT: usize = 0;
const N_PROCS_AT: usize = 4;
const ROUND_AT: usize = 8;
const VOTES_CAST_AT: usize = 16;
const HEADER_LEN: usize = 24;
const RECORD_LEN: usize = 8;

/// Size in bytes of the region for a pool of `n_procs`
pub fn region_len(n_procs: usize) -> usize {
    HEADER_LEN + RECORD_LEN * n_procs
}

pub struct SharedRoundState {
    map: MmapMut,
    n_procs: usize,
    path: PathBuf,
}

impl SharedRoundState {
    /// Create (or overwrite) the region for a fresh run
    pub fn create(path: impl AsRef<Path>, n_procs: usize) -> Result<Self> {
        let path = path.as_ref();
        if n_procs == 0 || n_procs > u32::MAX as usize {
            return Err(VotingError::Config(format!(
                "a pool needs between 1 and {} participants, got {}",
                u32::MAX,
                n_procs
            )));
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| VotingError::creation(path, e))?;
        file.set_len(region_len(n_procs) as u64)
            .map_err(|e| VotingError::creation(path, e))?;

        // SAFETY: the file was just sized and is never resized afterwards.
        // Concurrent access to its contents is serialized by the write lock.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| VotingError::creation(path, e))?;

        let mut state = Self {
            map,
            n_procs,
            path: path.to_path_buf(),
        };
        state.write_u32(MAGIC_AT, MAGIC);
        state.write_u32(N_PROCS_AT, n_procs as u32);
        state.write_u64(ROUND_AT, 0);
        state.write_u32(VOTES_CAST_AT, 0);
        tracing::debug!(path = %path.display(), n_procs, "round state created");
        Ok(state)
    }

    /// Map an existing region, checking it was created for the same pool size
    pub fn open(path: impl AsRef<Path>, n_procs: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| VotingError::creation(path, e))?;

        let len = file
            .metadata()
            .map_err(|e| VotingError::creation(path, e))?
            .len();
        if len != region_len(n_procs) as u64 {
            return Err(Corruption::BadHeader(format!(
                "region is {} bytes, expected {} for {} participants",
                len,
                region_len(n_procs),
                n_procs
            ))
            .into());
        }

        // SAFETY: see `create`.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| VotingError::creation(path, e))?;
        let state = Self {
            map,
            n_procs,
            path: path.to_path_buf(),
        };

        if state.read_u32(MAGIC_AT) != MAGIC {
            return Err(Corruption::BadHeader("magic number mismatch".to_string()).into());
        }
        let stored = state.read_u32(N_PROCS_AT) as usize;
        if stored != n_procs {
            return Err(Corruption::BadHeader(format!(
                "region holds {} participants, expected {}",
                stored, n_procs
            ))
            .into());
        }
        Ok(state)
    }

    pub fn n_procs(&self) -> usize {
        self.n_procs
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of votes a round needs to be complete
    pub fn votes_needed(&self) -> u32 {
        (self.n_procs - 1) as u32
    }

    /// Current round number
    pub fn round(&self, _held: &WriteGuard<'_>) -> u64 {
        self.read_u64(ROUND_AT)
    }

    /// Votes cast so far in the current round
    pub fn votes_cast(&self, _held: &WriteGuard<'_>) -> Result<u32> {
        let votes_cast = self.read_u32(VOTES_CAST_AT);
        if votes_cast > self.votes_needed() {
            return Err(Corruption::VoteCountOutOfRange {
                votes_cast,
                n_procs: self.n_procs,
            }
            .into());
        }
        Ok(votes_cast)
    }

    /// True once every voter of the round has voted
    pub fn is_round_complete(&self, held: &WriteGuard<'_>) -> Result<bool> {
        Ok(self.votes_cast(held)? == self.votes_needed())
    }

    /// Append a vote and return the new count
    pub fn record_vote(&mut self, held: &WriteGuard<'_>, vote: Vote) -> Result<u32> {
        if vote.participant >= self.n_procs {
            return Err(Corruption::UnknownParticipant {
                participant: vote.participant,
                n_procs: self.n_procs,
            }
            .into());
        }

        let round = self.round(held);
        let votes_cast = self.votes_cast(held)?;
        if votes_cast == self.votes_needed() {
            return Err(Corruption::RoundAlreadyComplete {
                round,
                votes_cast,
                expected: self.votes_needed(),
            }
            .into());
        }
        if self
            .records(votes_cast)
            .any(|(participant, _)| participant == vote.participant)
        {
            return Err(Corruption::DuplicateVote {
                participant: vote.participant,
                round,
            }
            .into());
        }

        let at = Self::record_at(votes_cast as usize);
        self.write_u32(at, vote.participant as u32);
        self.map[at + 4] = vote.ballot.to_byte();
        self.write_u32(VOTES_CAST_AT, votes_cast + 1);
        Ok(votes_cast + 1)
    }

    /// Votes of the current round in the order they were cast
    pub fn results(&self, held: &WriteGuard<'_>) -> Result<Vec<Vote>> {
        let votes_cast = self.votes_cast(held)?;
        self.records(votes_cast)
            .map(|(participant, byte)| -> Result<Vote> {
                Ok(Vote::new(participant, Ballot::from_byte(byte)?))
            })
            .collect()
    }

    /// Clear the round and advance to the next one, returning its number
    pub fn reset(&mut self, held: &WriteGuard<'_>) -> u64 {
        let next = self.round(held) + 1;
        self.map[HEADER_LEN..].fill(0);
        self.write_u32(VOTES_CAST_AT, 0);
        self.write_u64(ROUND_AT, next);
        next
    }

    fn record_at(index: usize) -> usize {
        HEADER_LEN + index * RECORD_LEN
    }

    fn records(&self, count: u32) -> impl Iterator<Item = (usize, u8)> + '_ {
        (0..count as usize).map(move |index| {
            let at = Self::record_at(index);
            (self.read_u32(at) as usize, self.map[at + 4])
        })
    }

    fn read_u32(&self, at: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.map[at..at + 4]);
        u32::from_le_bytes(bytes)
    }

    fn read_u64(&self, at: usize) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.map[at..at + 8]);
        u64::from_le_bytes(bytes)
    }

    fn write_u32(&mut self, at: usize, value: u32) {
        self.map[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn write_u64(&mut self, at: usize, value: u64) {
        self.map[at..at + 8].copy_from_slice(&value.to_le_bytes());
    }
}
