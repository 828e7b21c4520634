//! Repository locking for concurrent safety.
//!
//! Mutating operations hold an exclusive advisory lock (`flock(2)` on
//! Unix, via the `fs2` crate) on `.art/art.lock` for their duration.
//! The OS drops the lock when the holder exits or crashes, so there is
//! no stale-lock cleanup. The holder's pid is written into the file
//! purely as a diagnostic for anyone poking around `.art/` while an
//! operation runs.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{ArtError, ArtResult};

/// Name of the lock file inside the metadata directory.
const LOCK_FILE: &str = "art.lock";

/// First pause between lock probes; doubles up to [`MAX_BACKOFF`].
const INITIAL_BACKOFF: Duration = Duration::from_millis(2);

/// Longest pause between lock probes.
const MAX_BACKOFF: Duration = Duration::from_millis(50);

/// An exclusive repository lock, released on drop.
pub struct RepoLock {
    file: File,
}

impl RepoLock {
    /// Acquire the repository lock, probing with exponential backoff
    /// until `timeout` elapses.
    pub fn acquire(art_dir: &Path, timeout: Duration) -> ArtResult<Self> {
        let file = File::options()
            .create(true)
            .write(true)
            .open(art_dir.join(LOCK_FILE))?;

        let deadline = Instant::now() + timeout;
        let mut pause = INITIAL_BACKOFF;
        while file.try_lock_exclusive().is_err() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ArtError::LockTimeout);
            }
            std::thread::sleep(pause.min(remaining));
            pause = (pause * 2).min(MAX_BACKOFF);
        }

        let mut lock = RepoLock { file };
        lock.record_holder();
        Ok(lock)
    }

    /// Best-effort: leave our pid in the lock file. The flock is the
    /// actual gate; this is only for humans.
    fn record_holder(&mut self) {
        let _ = self.file.set_len(0);
        let _ = writeln!(self.file, "{}", std::process::id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_creates_lock_file_and_releases_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _lock = RepoLock::acquire(dir.path(), Duration::from_secs(1)).unwrap();
            assert!(dir.path().join("art.lock").exists());
        }
        // Dropped above, so a re-acquire succeeds without waiting.
        RepoLock::acquire(dir.path(), Duration::from_millis(10)).unwrap();
    }

    #[test]
    fn test_second_acquire_times_out_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let _held = RepoLock::acquire(dir.path(), Duration::from_secs(1)).unwrap();

        let started = Instant::now();
        let second = RepoLock::acquire(dir.path(), Duration::from_millis(80));
        assert!(matches!(second, Err(ArtError::LockTimeout)));
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn test_lock_file_names_the_holder() {
        let dir = tempfile::tempdir().unwrap();
        let _lock = RepoLock::acquire(dir.path(), Duration::from_secs(1)).unwrap();

        let recorded = std::fs::read_to_string(dir.path().join("art.lock")).unwrap();
        assert_eq!(recorded.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_waiter_proceeds_once_holder_drops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();

        let holder = RepoLock::acquire(&path, Duration::from_secs(1)).unwrap();
        let waiter =
            std::thread::spawn(move || RepoLock::acquire(&path, Duration::from_secs(5)));

        std::thread::sleep(Duration::from_millis(50));
        drop(holder);

        assert!(waiter.join().unwrap().is_ok());
    }
}
