//! File-lock based synchronization primitives
//!
//! Both locks are `flock` locks on files inside the run directory. Every
//! participant opens its own descriptor, so the kernel arbitrates between
//! participants whether they are separate processes or threads of one process.
//! A lock is dropped by the kernel when its holder exits, so no exit path can
//! leave a lock permanently held.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{fence, Ordering};

use fs2::FileExt;

use crate::error::{Result, VotingError};

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| VotingError::creation(path, e))
}

/// Non-blocking, winner-take-all lock that decides the round's candidate.
pub struct ElectionLock {
    file: File,
    path: PathBuf,
}

/// Proof of candidacy. Releases the election lock on drop.
pub struct ElectionGuard<'a> {
    lock: &'a ElectionLock,
    released: bool,
}

impl ElectionLock {
    /// Open (creating if needed) the lock file with a descriptor private to the caller
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            file: open_lock_file(path)?,
            path: path.to_path_buf(),
        })
    }

    /// Try to become the candidate
    ///
    /// Returns `Ok(None)` when another participant holds the lock; this is the
    /// normal outcome for every voter and has no side effect.
    pub fn try_acquire(&self) -> Result<Option<ElectionGuard<'_>>> {
        loop {
            match self.file.try_lock_exclusive() {
                Ok(()) => {
                    fence(Ordering::SeqCst);
                    tracing::trace!(path = %self.path.display(), "election lock acquired");
                    return Ok(Some(ElectionGuard {
                        lock: self,
                        released: false,
                    }));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(VotingError::operation("try-acquire election lock", e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ElectionGuard<'_> {
    /// Give up candidacy, making the lock available for the next election
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        fence(Ordering::SeqCst);
        self.lock
            .file
            .unlock()
            .map_err(|e| VotingError::operation("release election lock", e))?;
        tracing::trace!(path = %self.lock.path.display(), "election lock released");
        Ok(())
    }
}

impl Drop for ElectionGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.lock.file.unlock();
        }
    }
}

/// Blocking mutual exclusion around the shared round state.
pub struct WriteLock {
    file: File,
    path: PathBuf,
}

/// Held write lock. Releases on drop.
pub struct WriteGuard<'a> {
    lock: &'a WriteLock,
    released: bool,
}

impl WriteLock {
    /// Open (creating if needed) the lock file with a descriptor private to the caller
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            file: open_lock_file(path)?,
            path: path.to_path_buf(),
        })
    }

    /// Acquire the lock, blocking until it is free
    ///
    /// A wait interrupted by a signal is resumed; callers check for a stop
    /// request once they hold the lock.
    pub fn acquire(&self) -> Result<WriteGuard<'_>> {
        loop {
            match self.file.lock_exclusive() {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(VotingError::operation("acquire write lock", e)),
            }
        }
        fence(Ordering::SeqCst);
        Ok(WriteGuard {
            lock: self,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WriteGuard<'_> {
    /// Release the lock, surfacing a failed unlock instead of swallowing it
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        fence(Ordering::SeqCst);
        self.lock
            .file
            .unlock()
            .map_err(|e| VotingError::operation("release write lock", e))
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            fence(Ordering::SeqCst);
            let _ = self.lock.file.unlock();
        }
    }
}
