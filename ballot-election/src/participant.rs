//! Round driver: one participant's life from start signal to stop signal

use std::fmt;

use crate::ballot::{Ballot, RoundObserver};
use crate::candidate::{Candidacy, Leadership};
use crate::config::ElectionConfig;
use crate::error::{Corruption, Result};
use crate::pool::ParticipantPool;
use crate::signals::{self, ControlSignals};
use crate::state::SharedRoundState;
use crate::sync::{ElectionLock, WriteLock};
use crate::voter;

/// What a participant is for the duration of one round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Candidate,
    Voter,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Candidate => write!(f, "candidate"),
            Role::Voter => write!(f, "voter"),
        }
    }
}

/// Tally of a participant's run, logged when it exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParticipantSummary {
    pub id: usize,
    pub rounds_led: u64,
    pub votes_cast: u64,
}

/// One member of the pool with its own lock descriptors and state mapping
pub struct Participant {
    id: usize,
    election: ElectionLock,
    write_lock: WriteLock,
    state: SharedRoundState,
    config: ElectionConfig,
}

impl Participant {
    /// Open this participant's handles on the pool's shared files
    pub fn join(pool: &ParticipantPool, id: usize, config: &ElectionConfig) -> Result<Self> {
        if id >= pool.n_procs() {
            return Err(Corruption::UnknownParticipant {
                participant: id,
                n_procs: pool.n_procs(),
            }
            .into());
        }
        config.validate()?;

        let paths = pool.paths();
        Ok(Self {
            id,
            election: ElectionLock::open(paths.election_lock())?,
            write_lock: WriteLock::open(paths.write_lock())?,
            state: SharedRoundState::open(paths.state(), pool.n_procs())?,
            config: config.clone(),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for start, then run rounds until stop
    ///
    /// Every lock this participant holds is released before returning,
    /// whether the run ends by stop request or by error.
    pub fn run<S, O>(&mut self, signals: &S, observer: &mut O) -> Result<ParticipantSummary>
    where
        S: ControlSignals + ?Sized,
        O: RoundObserver + ?Sized,
    {
        let span = tracing::info_span!("participant", id = self.id);
        let _enter = span.enter();

        let mut summary = ParticipantSummary {
            id: self.id,
            ..Default::default()
        };

        if !signals::wait_for_start(signals, self.config.poll_interval()) {
            tracing::info!("stopped before start");
            return Ok(summary);
        }
        tracing::info!(pid = std::process::id(), "started");

        while !signals.stop_requested() {
            match self.election.try_acquire()? {
                Some(election) => {
                    tracing::trace!(role = %Role::Candidate, "elected");
                    let candidacy = Candidacy {
                        id: self.id,
                        write_lock: &self.write_lock,
                        state: &mut self.state,
                        signals,
                        config: &self.config,
                    };
                    match candidacy.lead(election, observer)? {
                        Leadership::Completed(report) => {
                            summary.rounds_led += 1;
                            tracing::trace!(round = report.round, "round led");
                        }
                        Leadership::Interrupted => break,
                    }
                }
                None => {
                    tracing::trace!(role = %Role::Voter, "election lost");
                    let round = voter::cast_vote(
                        self.id,
                        Ballot::random(),
                        &self.write_lock,
                        &mut self.state,
                    )?;
                    summary.votes_cast += 1;

                    let next_round_open = voter::await_next_round(
                        round,
                        &self.write_lock,
                        &self.state,
                        signals,
                        self.config.poll_interval(),
                    )?;
                    if !next_round_open {
                        break;
                    }
                }
            }
        }

        tracing::info!(
            rounds_led = summary.rounds_led,
            votes_cast = summary.votes_cast,
            "stopped"
        );
        Ok(summary)
    }
}

/// Run participant `id` of `pool` to completion
///
/// Blocks until `signals` requests start, runs rounds until it requests stop,
/// and reports every round this participant leads to `observer`.
pub fn run_voter_process<S, O>(
    pool: &ParticipantPool,
    id: usize,
    config: &ElectionConfig,
    signals: &S,
    observer: &mut O,
) -> Result<ParticipantSummary>
where
    S: ControlSignals + ?Sized,
    O: RoundObserver + ?Sized,
{
    let result = Participant::join(pool, id, config)
        .and_then(|mut participant| participant.run(signals, observer));
    if let Err(e) = &result {
        tracing::error!(id, error = %e, "participant failed");
    }
    result
}
