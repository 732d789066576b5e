//! Lock-based voting rounds for a fixed pool of cooperating processes.
//!
//! Every round one participant wins a non-blocking election and becomes the
//! candidate; the others vote. The candidate waits until all votes are in,
//! reports them, resets the shared state and hands the election back.
//!
//! # Overview
//!
//! - **File-lock based**: [`ElectionLock`] and [`WriteLock`] are `flock` locks,
//!   one descriptor per participant, released by the kernel if a holder exits
//! - **Process-shared state**: [`SharedRoundState`] lives in a memory-mapped
//!   file that every participant maps on its own
//! - **Signal driven**: participants start on `SIGUSR1` and stop on `SIGINT`
//!   or `SIGTERM` ([`ProcessSignals`]); tests drive them with [`ManualSignals`]
//! - **Round barrier**: a voter does not re-enter the election until the
//!   candidate has reset the round it voted in
//!
//! # Example
//!
//! ```ignore
//! use ballot_election::{
//!     run_voter_process, ElectionConfig, ParticipantPool, ProcessSignals, RoundReport,
//! };
//!
//! let config = ElectionConfig::new().with_base_dir("/tmp");
//! let pool = ParticipantPool::create(config.run_paths(std::process::id()), 3)?;
//! let signals = ProcessSignals::install()?;
//!
//! // In each forked child:
//! let mut print = |report: &RoundReport| println!("{report}");
//! let summary = run_voter_process(&pool, id, &config, &signals, &mut print)?;
//! ```

mod ballot;
mod candidate;
mod config;
mod error;
mod participant;
mod pool;
mod signals;
mod state;
mod sync;
mod voter;

pub use ballot::{Ballot, RoundObserver, RoundReport, Verdict, Vote};
pub use config::{ElectionConfig, RunPaths, DEFAULT_PREFIX};
pub use error::{Corruption, Result, VotingError};
pub use participant::{run_voter_process, Participant, ParticipantSummary, Role};
pub use pool::ParticipantPool;
pub use signals::{
    pause, wait_for_start, ControlSignals, ManualSignals, ProcessSignals, START_SIGNAL,
    STOP_SIGNAL,
};
pub use state::{region_len, SharedRoundState};
pub use sync::{ElectionGuard, ElectionLock, WriteGuard, WriteLock};
