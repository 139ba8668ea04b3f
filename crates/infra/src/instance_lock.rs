//! Single-instance lock backed by an exclusive lock on a PID file
//!
//! Keeps overlapping invocations (for example two cron runs) from editing the
//! buffer layer at the same time. The OS releases the lock when the holder
//! exits, so a crashed run never blocks the next one.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use nestbuffer_domain::{NestBufferError, Result};

const PID_FILE_NAME: &str = "nestbuffer.pid";

/// Single-instance lock manager
#[derive(Debug)]
pub struct InstanceLock {
    pid_file: PathBuf,
    file: File,
}

impl InstanceLock {
    /// Take the lock in `lock_dir` and record the current PID in it.
    ///
    /// # Errors
    /// Returns `NestBufferError::Config` if another live instance holds the
    /// lock or the PID file cannot be opened or written.
    pub fn acquire<P: AsRef<Path>>(lock_dir: P) -> Result<Self> {
        let pid_file = lock_dir.as_ref().join(PID_FILE_NAME);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&pid_file)
            .map_err(|e| {
                NestBufferError::Config(format!("Failed to open PID file {}: {e}", pid_file.display()))
            })?;

        if let Err(err) = file.try_lock_exclusive() {
            if err.raw_os_error() != fs2::lock_contended_error().raw_os_error() {
                return Err(NestBufferError::Config(format!(
                    "Failed to lock PID file {}: {err}",
                    pid_file.display()
                )));
            }

            let holder = read_pid(&mut file);
            tracing::warn!(existing_pid = ?holder, "instance_lock.process_active");
            let holder = holder.map_or_else(|| "unknown".to_string(), |pid| pid.to_string());
            return Err(NestBufferError::Config(format!(
                "Another instance is already running (PID: {holder}). Please stop it first."
            )));
        }

        if let Some(stale_pid) = read_pid(&mut file) {
            tracing::warn!(stale_pid, "instance_lock.stale_pid_file_detected");
        }

        let current_pid = std::process::id();
        write_pid(&mut file, Some(current_pid))
            .map_err(|e| NestBufferError::Config(format!("Failed to write PID file: {e}")))?;

        tracing::info!(pid = current_pid, path = %pid_file.display(), "instance_lock.acquired");

        Ok(Self { pid_file, file })
    }

    pub fn path(&self) -> &Path {
        &self.pid_file
    }
}

/// PID recorded in the file, if it holds one.
fn read_pid(file: &mut File) -> Option<u32> {
    let mut content = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut content).ok()?;
    content.trim().parse().ok()
}

fn write_pid(file: &mut File, pid: Option<u32>) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    if let Some(pid) = pid {
        file.write_all(pid.to_string().as_bytes())?;
    }
    file.sync_all()
}

// The file itself stays in place; unlinking it would let a waiting opener
// lock an orphaned inode while a newcomer locks a fresh one.
impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = write_pid(&mut self.file, None) {
            tracing::warn!(error = %e, path = %self.pid_file.display(), "instance_lock.clear_pid_failed");
        }
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(error = %e, path = %self.pid_file.display(), "instance_lock.unlock_failed");
        } else {
            tracing::info!(path = %self.pid_file.display(), "instance_lock.released");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::{Arc, Barrier};
    use std::thread;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn second_acquire_fails_until_first_is_dropped() {
        let dir = TempDir::new().unwrap();

        let first = InstanceLock::acquire(dir.path()).expect("first lock");
        assert_eq!(fs::read_to_string(first.path()).unwrap(), std::process::id().to_string());

        let second = InstanceLock::acquire(dir.path());
        assert!(matches!(second, Err(NestBufferError::Config(msg)) if msg.contains("already running")));

        drop(first);
        assert_eq!(fs::read_to_string(dir.path().join(PID_FILE_NAME)).unwrap(), "");

        let third = InstanceLock::acquire(dir.path());
        assert!(third.is_ok());
    }

    #[test]
    fn stale_pid_file_is_reclaimed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PID_FILE_NAME), u32::MAX.to_string()).unwrap();

        let lock = InstanceLock::acquire(dir.path()).expect("stale lock reclaimed");
        let content = fs::read_to_string(lock.path()).unwrap();
        assert_eq!(content, std::process::id().to_string());
    }

    #[test]
    fn garbage_pid_file_is_replaced() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PID_FILE_NAME), "not a pid").unwrap();

        assert!(InstanceLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn racing_acquires_admit_exactly_one_holder() {
        const CONTENDERS: usize = 8;
        let dir = TempDir::new().unwrap();

        for _ in 0..50 {
            let barrier = Arc::new(Barrier::new(CONTENDERS));
            let handles: Vec<_> = (0..CONTENDERS)
                .map(|_| {
                    let barrier = Arc::clone(&barrier);
                    let lock_dir = dir.path().to_path_buf();
                    thread::spawn(move || {
                        barrier.wait();
                        InstanceLock::acquire(lock_dir)
                    })
                })
                .collect();

            // Every result stays alive until all contenders have finished.
            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        }
    }
}
