use std::io::Write;

use ballot_election::{RoundObserver, RoundReport};

/// Prints one line per led round: `Candidate 1 => [ Y N ] => Rejected`
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> RoundObserver for ConsoleReporter<W> {
    fn round_completed(&mut self, report: &RoundReport) {
        // Flush per line: the process may exit before a buffered write lands.
        if let Err(e) = writeln!(self.out, "{report}").and_then(|_| self.out.flush()) {
            tracing::warn!(round = report.round, "failed to print round: {}", e);
        }
    }
}
