//! Ballots, votes and round reports

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Corruption;

/// What a voter casts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ballot {
    Yes,
    No,
}

impl Ballot {
    /// Draw a ballot with equal odds
    pub fn random() -> Self {
        if rand::random::<bool>() {
            Ballot::Yes
        } else {
            Ballot::No
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Ballot::Yes => 'Y',
            Ballot::No => 'N',
        }
    }

    pub(crate) fn to_byte(self) -> u8 {
        self.symbol() as u8
    }

    pub(crate) fn from_byte(byte: u8) -> Result<Self, Corruption> {
        match byte {
            b'Y' => Ok(Ballot::Yes),
            b'N' => Ok(Ballot::No),
            other => Err(Corruption::UnreadableBallot(other)),
        }
    }
}

/// One recorded vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub participant: usize,
    pub ballot: Ballot,
}

impl Vote {
    pub fn new(participant: usize, ballot: Ballot) -> Self {
        Self {
            participant,
            ballot,
        }
    }
}

/// Outcome of a round: accepted on a strict majority of yes votes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Accepted,
    Rejected,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accepted => write!(f, "Accepted"),
            Verdict::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Everything the candidate learned in one completed round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u64,
    pub candidate: usize,
    pub votes: Vec<Vote>,
}

impl RoundReport {
    pub fn yes_votes(&self) -> usize {
        self.votes
            .iter()
            .filter(|vote| vote.ballot == Ballot::Yes)
            .count()
    }

    pub fn no_votes(&self) -> usize {
        self.votes.len() - self.yes_votes()
    }

    pub fn verdict(&self) -> Verdict {
        if self.yes_votes() > self.no_votes() {
            Verdict::Accepted
        } else {
            Verdict::Rejected
        }
    }
}

/// `Candidate 2 => [ Y N Y ] => Accepted`
impl fmt::Display for RoundReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Candidate {} => [ ", self.candidate)?;
        for vote in &self.votes {
            write!(f, "{} ", vote.ballot.symbol())?;
        }
        write!(f, "] => {}", self.verdict())
    }
}

/// Receives the report of every round this participant led
pub trait RoundObserver {
    fn round_completed(&mut self, report: &RoundReport);
}

impl<F> RoundObserver for F
where
    F: FnMut(&RoundReport),
{
    fn round_completed(&mut self, report: &RoundReport) {
        self(report)
    }
}
