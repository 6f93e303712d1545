//! Cooperative cross-process file lock.
//!
//! Mutual exclusion over a file path via an exclusively-created marker file at
//! `<path>.lock`. The lock only cooperates with other callers using the same
//! discipline — it is not an OS-enforced lock. A crashed holder is broken by
//! the staleness check on the marker's modification time.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{MemoryError, Result};

/// Tunables for lock acquisition.
#[derive(Debug, Clone)]
pub struct LockOptions {
    /// Give up with [`MemoryError::LockTimeout`] after waiting this long.
    pub timeout: Duration,
    /// A marker older than this is treated as abandoned and evicted.
    pub stale_after: Duration,
    /// Sleep between acquisition attempts while the marker is held.
    pub retry_delay: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            stale_after: Duration::from_secs(30),
            retry_delay: Duration::from_millis(50),
        }
    }
}

/// Marker path for a locked file: `<path>.lock`.
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// Removes the marker when the critical section exits, success or panic.
struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Tolerate "already removed" — another process may have evicted us
        // as stale during a long critical section.
        let _ = fs::remove_file(&self.path);
    }
}

/// Run `f` while holding the cooperative lock for `path`.
///
/// Acquisition loops: exclusive-create the marker; on contention, fail once
/// the timeout elapses, evict a stale marker and retry immediately, otherwise
/// sleep the retry delay. Any filesystem error other than "already exists"
/// aborts without retry.
pub fn with_path_lock<T>(
    path: &Path,
    opts: &LockOptions,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let marker = lock_path_for(path);
    let started = Instant::now();

    loop {
        match OpenOptions::new().write(true).create_new(true).open(&marker) {
            Ok(mut file) => {
                // Holder metadata is best-effort; a failed write must not
                // abort an otherwise successful acquisition.
                let meta = serde_json::json!({
                    "pid": std::process::id(),
                    "createdAt": super::now_rfc3339(),
                });
                let _ = file.write_all(meta.to_string().as_bytes());
                drop(file);

                let _guard = LockGuard {
                    path: marker.clone(),
                };
                return f();
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                if started.elapsed() >= opts.timeout {
                    return Err(MemoryError::LockTimeout { path: marker });
                }
                if marker_is_stale(&marker, opts.stale_after) {
                    tracing::warn!(marker = %marker.display(), "evicting stale lock marker");
                    let _ = fs::remove_file(&marker);
                    continue;
                }
                std::thread::sleep(opts.retry_delay);
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Whether the marker's mtime is older than the staleness threshold.
/// A marker that vanished mid-check is simply "not stale" — the next create
/// attempt will succeed.
fn marker_is_stale(marker: &Path, stale_after: Duration) -> bool {
    fs::metadata(marker)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|mtime| mtime.elapsed().ok())
        .map(|age| age >= stale_after)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn scratch() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.jsonl");
        (dir, path)
    }

    #[test]
    fn lock_runs_critical_section_and_removes_marker() {
        let (_dir, path) = scratch();
        let opts = LockOptions::default();

        let result = with_path_lock(&path, &opts, || Ok(42)).unwrap();
        assert_eq!(result, 42);
        assert!(!lock_path_for(&path).exists());
    }

    #[test]
    fn marker_removed_even_on_error() {
        let (_dir, path) = scratch();
        let opts = LockOptions::default();

        let result: Result<()> = with_path_lock(&path, &opts, || {
            Err(MemoryError::Validation("boom".into()))
        });
        assert!(result.is_err());
        assert!(!lock_path_for(&path).exists());
    }

    #[test]
    fn contended_lock_times_out_with_path() {
        let (_dir, path) = scratch();
        std::fs::write(lock_path_for(&path), b"{}").unwrap();

        let opts = LockOptions {
            timeout: Duration::from_millis(50),
            stale_after: Duration::from_secs(60),
            retry_delay: Duration::from_millis(5),
        };

        let err = with_path_lock(&path, &opts, || Ok(())).unwrap_err();
        match err {
            MemoryError::LockTimeout { path: reported } => {
                assert_eq!(reported, lock_path_for(&path));
            }
            other => panic!("expected LockTimeout, got {other:?}"),
        }
    }

    #[test]
    fn stale_marker_is_evicted() {
        let (_dir, path) = scratch();
        std::fs::write(lock_path_for(&path), b"{}").unwrap();

        // Zero staleness threshold: any existing marker counts as abandoned.
        let opts = LockOptions {
            timeout: Duration::from_secs(5),
            stale_after: Duration::ZERO,
            retry_delay: Duration::from_millis(5),
        };

        let result = with_path_lock(&path, &opts, || Ok("ran")).unwrap();
        assert_eq!(result, "ran");
        assert!(!lock_path_for(&path).exists());
    }

    #[test]
    fn concurrent_sections_are_serialized() {
        let (_dir, path) = scratch();
        let path = Arc::new(path);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = Arc::clone(&path);
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                std::thread::spawn(move || {
                    let opts = LockOptions {
                        timeout: Duration::from_secs(10),
                        stale_after: Duration::from_secs(60),
                        retry_delay: Duration::from_millis(1),
                    };
                    with_path_lock(&path, &opts, || {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(2));
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
