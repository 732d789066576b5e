//! The participant that won the election: wait for every vote, report, reset.

use std::thread;

use crate::ballot::{RoundObserver, RoundReport};
use crate::config::ElectionConfig;
use crate::error::Result;
use crate::signals::{self, ControlSignals};
use crate::state::SharedRoundState;
use crate::sync::{ElectionGuard, WriteLock};

/// How a led round ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Leadership {
    /// Round reported and the election lock handed back
    Completed(RoundReport),
    /// Stop requested before the round finished; nothing was reported
    Interrupted,
}

/// Everything a candidate touches while leading one round
pub(crate) struct Candidacy<'a, S: ?Sized> {
    pub id: usize,
    pub write_lock: &'a WriteLock,
    pub state: &'a mut SharedRoundState,
    pub signals: &'a S,
    pub config: &'a ElectionConfig,
}

impl<S> Candidacy<'_, S>
where
    S: ControlSignals + ?Sized,
{
    /// Run the round from election to release
    ///
    /// The election guard is consumed: it is released after the reset, or
    /// dropped (and thereby released) on any early return.
    pub(crate) fn lead<O>(
        self,
        election: ElectionGuard<'_>,
        observer: &mut O,
    ) -> Result<Leadership>
    where
        O: RoundObserver + ?Sized,
    {
        if !self.await_votes()? {
            tracing::debug!("stop requested while collecting votes");
            return Ok(Leadership::Interrupted);
        }

        let report = {
            let held = self.write_lock.acquire()?;
            let report = RoundReport {
                round: self.state.round(&held),
                candidate: self.id,
                votes: self.state.results(&held)?,
            };
            held.release()?;
            report
        };
        tracing::debug!(
            round = report.round,
            yes = report.yes_votes(),
            no = report.no_votes(),
            verdict = %report.verdict(),
            "round complete"
        );
        observer.round_completed(&report);

        // A stop during the pause still resets and releases; the driver sees it next.
        signals::pause(
            self.signals,
            self.config.round_pause(),
            self.config.poll_interval(),
        );

        let held = self.write_lock.acquire()?;
        let next = self.state.reset(&held);
        held.release()?;
        election.release()?;
        tracing::trace!(next, "candidacy released");

        Ok(Leadership::Completed(report))
    }

    /// Poll for completion without holding the write lock between checks
    fn await_votes(&self) -> Result<bool> {
        loop {
            if self.signals.stop_requested() {
                return Ok(false);
            }

            let held = self.write_lock.acquire()?;
            let complete = self.state.is_round_complete(&held)?;
            held.release()?;

            if complete {
                return Ok(true);
            }
            thread::sleep(self.config.poll_interval());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot::{Ballot, Vote};
    use crate::signals::ManualSignals;
    use crate::sync::ElectionLock;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        election: ElectionLock,
        write_lock: WriteLock,
        state: SharedRoundState,
        config: ElectionConfig,
    }

    fn fixture(n_procs: usize) -> Fixture {
        let dir = TempDir::new().unwrap();
        Fixture {
            election: ElectionLock::open(dir.path().join("election.lock")).unwrap(),
            write_lock: WriteLock::open(dir.path().join("write.lock")).unwrap(),
            state: SharedRoundState::create(dir.path().join("round.state"), n_procs).unwrap(),
            config: ElectionConfig::new().with_round_pause(Duration::ZERO),
            _dir: dir,
        }
    }

    #[test]
    fn test_lead_single_participant_round() {
        let mut fx = fixture(1);
        let signals = ManualSignals::new();
        let mut reports = Vec::new();
        let mut observer = |report: &RoundReport| reports.push(report.clone());

        let guard = fx.election.try_acquire().unwrap().unwrap();
        let outcome = Candidacy {
            id: 0,
            write_lock: &fx.write_lock,
            state: &mut fx.state,
            signals: &signals,
            config: &fx.config,
        }
        .lead(guard, &mut observer)
        .unwrap();

        let expected = RoundReport {
            round: 0,
            candidate: 0,
            votes: Vec::new(),
        };
        assert_eq!(outcome, Leadership::Completed(expected.clone()));
        assert_eq!(reports, vec![expected]);
    }

    #[test]
    fn test_lead_reports_votes_then_resets_and_releases() {
        let mut fx = fixture(3);
        let signals = ManualSignals::new();
        {
            let held = fx.write_lock.acquire().unwrap();
            fx.state.record_vote(&held, Vote::new(1, Ballot::Yes)).unwrap();
            fx.state.record_vote(&held, Vote::new(2, Ballot::Yes)).unwrap();
        }

        let mut seen = Vec::new();
        let mut observer = |report: &RoundReport| seen.push(report.to_string());
        let guard = fx.election.try_acquire().unwrap().unwrap();
        let outcome = Candidacy {
            id: 0,
            write_lock: &fx.write_lock,
            state: &mut fx.state,
            signals: &signals,
            config: &fx.config,
        }
        .lead(guard, &mut observer)
        .unwrap();

        assert!(matches!(outcome, Leadership::Completed(ref r) if r.votes.len() == 2));
        assert_eq!(seen, vec!["Candidate 0 => [ Y Y ] => Accepted".to_string()]);

        let held = fx.write_lock.acquire().unwrap();
        assert_eq!(fx.state.round(&held), 1);
        assert_eq!(fx.state.votes_cast(&held).unwrap(), 0);
        drop(held);

        let other = ElectionLock::open(fx.election.path()).unwrap();
        assert!(other.try_acquire().unwrap().is_some());
    }

    #[test]
    fn test_lead_interrupted_while_waiting_releases_lock() {
        let mut fx = fixture(3);
        let signals = ManualSignals::new();
        signals.stop();

        let mut reported = 0;
        let mut observer = |_: &RoundReport| reported += 1;
        let guard = fx.election.try_acquire().unwrap().unwrap();
        let outcome = Candidacy {
            id: 0,
            write_lock: &fx.write_lock,
            state: &mut fx.state,
            signals: &signals,
            config: &fx.config,
        }
        .lead(guard, &mut observer)
        .unwrap();

        assert_eq!(outcome, Leadership::Interrupted);
        assert_eq!(reported, 0);
        let other = ElectionLock::open(fx.election.path()).unwrap();
        assert!(other.try_acquire().unwrap().is_some());
    }
}
