//! A participant that lost the election: vote once, then wait for the next round.

use std::thread;
use std::time::Duration;

use crate::ballot::{Ballot, Vote};
use crate::error::Result;
use crate::signals::ControlSignals;
use crate::state::SharedRoundState;
use crate::sync::WriteLock;

/// Record this participant's ballot. Returns the round the vote went into.
pub(crate) fn cast_vote(
    id: usize,
    ballot: Ballot,
    write_lock: &WriteLock,
    state: &mut SharedRoundState,
) -> Result<u64> {
    let held = write_lock.acquire()?;
    let round = state.round(&held);
    let votes_cast = state.record_vote(&held, Vote::new(id, ballot))?;
    held.release()?;

    tracing::debug!(round, votes_cast, ballot = %ballot.symbol(), "vote cast");
    Ok(round)
}

/// Round barrier: wait until the candidate of `voted_in` has reset the state.
///
/// Returns false if stop was requested while waiting.
pub(crate) fn await_next_round<S>(
    voted_in: u64,
    write_lock: &WriteLock,
    state: &SharedRoundState,
    signals: &S,
    poll: Duration,
) -> Result<bool>
where
    S: ControlSignals + ?Sized,
{
    loop {
        if signals.stop_requested() {
            return Ok(false);
        }

        let held = write_lock.acquire()?;
        let round = state.round(&held);
        held.release()?;

        if round != voted_in {
            tracing::trace!(voted_in, round, "next round open");
            return Ok(true);
        }
        thread::sleep(poll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::ManualSignals;
    use tempfile::TempDir;

    const POLL: Duration = Duration::from_millis(1);

    fn setup(n_procs: usize) -> (TempDir, WriteLock, SharedRoundState) {
        let dir = TempDir::new().unwrap();
        let lock = WriteLock::open(dir.path().join("write.lock")).unwrap();
        let state = SharedRoundState::create(dir.path().join("round.state"), n_procs).unwrap();
        (dir, lock, state)
    }

    #[test]
    fn test_cast_vote_records_ballot() {
        let (_dir, lock, mut state) = setup(3);

        let round = cast_vote(1, Ballot::No, &lock, &mut state).unwrap();
        assert_eq!(round, 0);

        let held = lock.acquire().unwrap();
        assert_eq!(state.results(&held).unwrap(), vec![Vote::new(1, Ballot::No)]);
    }

    #[test]
    fn test_cast_vote_twice_in_round_fails() {
        let (_dir, lock, mut state) = setup(3);

        cast_vote(1, Ballot::Yes, &lock, &mut state).unwrap();
        assert!(cast_vote(1, Ballot::Yes, &lock, &mut state).is_err());
    }

    #[test]
    fn test_cast_vote_releases_write_lock() {
        let (_dir, lock, mut state) = setup(3);

        cast_vote(2, Ballot::Yes, &lock, &mut state).unwrap();

        let other = WriteLock::open(lock.path()).unwrap();
        other.acquire().unwrap().release().unwrap();
    }

    #[test]
    fn test_await_next_round_passes_after_reset() {
        let (_dir, lock, mut state) = setup(2);
        let signals = ManualSignals::new();

        let round = cast_vote(1, Ballot::Yes, &lock, &mut state).unwrap();
        {
            let held = lock.acquire().unwrap();
            state.reset(&held);
        }

        assert!(await_next_round(round, &lock, &state, &signals, POLL).unwrap());
    }

    #[test]
    fn test_await_next_round_stops_on_signal() {
        let (_dir, lock, mut state) = setup(3);
        let signals = ManualSignals::new();

        let round = cast_vote(1, Ballot::Yes, &lock, &mut state).unwrap();
        signals.stop();

        assert!(!await_next_round(round, &lock, &state, &signals, POLL).unwrap());
    }
}
