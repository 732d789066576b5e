//! Error types for voting rounds

use std::io;
use std::path::PathBuf;

/// Ways the shared round state can contradict the protocol
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Corruption {
    /// A vote arrived after every voter had already voted
    #[error("round {round} already holds {votes_cast} of {expected} votes")]
    RoundAlreadyComplete {
        round: u64,
        votes_cast: u32,
        expected: u32,
    },

    /// The same participant tried to vote twice in one round
    #[error("participant {participant} already voted in round {round}")]
    DuplicateVote { participant: usize, round: u64 },

    /// A participant id outside the pool
    #[error("participant {participant} is not part of a pool of {n_procs}")]
    UnknownParticipant { participant: usize, n_procs: usize },

    /// The stored vote counter is outside `0..=n_procs - 1`
    #[error("vote count {votes_cast} out of range for a pool of {n_procs}")]
    VoteCountOutOfRange { votes_cast: u32, n_procs: usize },

    /// A stored ballot byte that is neither yes nor no
    #[error("unreadable ballot {0:#04x}")]
    UnreadableBallot(u8),

    /// The mapped file is not a round-state region
    #[error("bad state header: {0}")]
    BadHeader(String),
}

/// Errors that can occur while running voting rounds
#[derive(Debug, thiserror::Error)]
pub enum VotingError {
    /// A lock file or the shared state region could not be created
    #[error("Failed to create {}: {source}", .path.display())]
    PrimitiveCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An acquire, try-acquire or release failed for a reason other than contention
    #[error("Failed to {operation}: {source}")]
    PrimitiveOperation {
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// The shared round state violates an invariant
    #[error("State corruption: {0}")]
    StateCorruption(#[from] Corruption),

    /// Installing a handler or delivering a signal failed
    #[error("Signal error: {0}")]
    Signal(#[from] nix::Error),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl VotingError {
    /// Create a PrimitiveCreation error.
    pub fn creation(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::PrimitiveCreation {
            path: path.into(),
            source,
        }
    }

    /// Create a PrimitiveOperation error.
    pub fn operation(operation: &'static str, source: io::Error) -> Self {
        Self::PrimitiveOperation { operation, source }
    }
}

/// Result type for voting operations
pub type Result<T> = std::result::Result<T, VotingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_voting_error_display() {
        let err = VotingError::from(Corruption::DuplicateVote {
            participant: 2,
            round: 7,
        });
        assert_eq!(
            format!("{}", err),
            "State corruption: participant 2 already voted in round 7"
        );

        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = VotingError::creation("/run/ballot.state", io_err);
        assert!(format!("{}", err).contains("Failed to create /run/ballot.state"));
    }

    #[test]
    fn test_voting_error_source() {
        let err = VotingError::Config("no participants".to_string());
        assert!(err.source().is_none());

        let io_err = io::Error::new(io::ErrorKind::Other, "bad fd");
        let err = VotingError::operation("acquire write lock", io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_all_corruption_variants_display() {
        let complete = Corruption::RoundAlreadyComplete {
            round: 1,
            votes_cast: 2,
            expected: 2,
        };
        assert!(format!("{}", complete).contains("already holds 2 of 2"));

        let unknown = Corruption::UnknownParticipant {
            participant: 9,
            n_procs: 3,
        };
        assert!(format!("{}", unknown).contains("pool of 3"));

        let range = Corruption::VoteCountOutOfRange {
            votes_cast: 5,
            n_procs: 3,
        };
        assert!(format!("{}", range).contains("out of range"));

        assert!(format!("{}", Corruption::UnreadableBallot(0x7f)).contains("0x7f"));
        assert!(format!("{}", Corruption::BadHeader("magic".into())).contains("magic"));
    }
}
