use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "voting")]
#[command(version)]
#[command(about = "Run repeated voting rounds across a pool of processes")]
#[command(long_about = "
voting forks N_PROCS participant processes that share a lock-protected round
state. Every round one participant becomes the candidate and the rest vote;
the candidate prints the round's ballots and verdict. After N_SECS seconds (or
on Ctrl-C) every participant is stopped and the run directory is removed.

Example usage:
  voting 3 2                         # three participants for two seconds
  voting 5 10 --round-pause-ms 100   # faster rounds
  voting 4 5 --config ballot.toml    # read tunables from a TOML file
")]
pub struct Cli {
    /// Number of participant processes
    #[arg(value_parser = clap::value_parser!(u32).range(1..=1024))]
    pub n_procs: u32,

    /// Seconds to run before stopping every participant
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub n_secs: u64,

    /// TOML file with election settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory the run directory is created in
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Pause the candidate takes after each round, in milliseconds
    #[arg(long)]
    pub round_pause_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
