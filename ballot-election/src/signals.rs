//! Start and stop control
//!
//! Participants are released by `SIGUSR1` and told to finish by `SIGINT` or
//! `SIGTERM`. The handlers only flip atomic flags; participants observe them at
//! their suspension points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use nix::libc::c_int;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::error::Result;

/// Signal that releases participants into the round loop
pub const START_SIGNAL: Signal = Signal::SIGUSR1;

/// Signal the supervisor sends to end a run
pub const STOP_SIGNAL: Signal = Signal::SIGINT;

/// Where a participant learns that it may start and must stop
pub trait ControlSignals {
    fn start_requested(&self) -> bool;
    fn stop_requested(&self) -> bool;
}

static START_REQUESTED: AtomicBool = AtomicBool::new(false);
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn record_signal(signal: c_int) {
    if signal == START_SIGNAL as c_int {
        START_REQUESTED.store(true, Ordering::SeqCst);
    } else {
        STOP_REQUESTED.store(true, Ordering::SeqCst);
    }
}

/// Control driven by real process signals.
///
/// Install before forking participants: children inherit the handlers, so a
/// start signal that arrives before a child reaches its wait loop is not lost.
#[derive(Debug, Clone, Copy)]
pub struct ProcessSignals {
    _installed: (),
}

impl ProcessSignals {
    pub fn install() -> Result<Self> {
        let action = SigAction::new(
            SigHandler::Handler(record_signal),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        for signal in [START_SIGNAL, Signal::SIGINT, Signal::SIGTERM] {
            // SAFETY: the handler only stores to atomics, which is async-signal-safe.
            unsafe { sigaction(signal, &action) }?;
        }
        tracing::debug!("signal handlers installed");
        Ok(Self { _installed: () })
    }
}

impl ControlSignals for ProcessSignals {
    fn start_requested(&self) -> bool {
        START_REQUESTED.load(Ordering::SeqCst)
    }

    fn stop_requested(&self) -> bool {
        STOP_REQUESTED.load(Ordering::SeqCst)
    }
}

/// Control flipped by hand, for running participants as threads.
#[derive(Debug, Clone, Default)]
pub struct ManualSignals {
    start: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl ManualSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) {
        self.start.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl ControlSignals for ManualSignals {
    fn start_requested(&self) -> bool {
        self.start.load(Ordering::SeqCst)
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Block until start is requested. Returns false if stop came first.
pub fn wait_for_start<S>(signals: &S, poll: Duration) -> bool
where
    S: ControlSignals + ?Sized,
{
    loop {
        if signals.stop_requested() {
            return false;
        }
        if signals.start_requested() {
            return true;
        }
        thread::sleep(poll);
    }
}

/// Sleep for `duration` unless stop is requested. Returns false if interrupted.
pub fn pause<S>(signals: &S, duration: Duration, poll: Duration) -> bool
where
    S: ControlSignals + ?Sized,
{
    let deadline = Instant::now() + duration;
    loop {
        if signals.stop_requested() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(poll.min(deadline - now));
    }
}
