//! Write-completion probe for watched files.
//!
//! A freshly detected file may still be mid-copy. Before an item is
//! extracted, its path must settle: the observed size has to hold for a
//! full probe interval, both ends of the file have to be readable, and
//! the file must not be write-locked away from this process. The probe
//! owns all of its bookkeeping; nothing is tracked across calls.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::trace;

use crate::config::QuiescenceSettings;

/// Bytes read from each end of the file when probing readability
const PROBE_WINDOW: u64 = 1024;

/// Outcome of waiting for a file to settle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quiescence {
    /// Size held for a full interval and both ends were readable
    Stable,

    /// The attempt budget ran out before the file settled
    TimedOut,

    /// The path no longer exists
    Gone,
}

/// Wait for a file to finish being written.
///
/// Polls at the configured interval, up to the configured attempt
/// budget. The first size observation never declares quiescence, so a
/// stable file needs two attempts minimum. Transient probe I/O failures
/// count as "still writing" and consume an attempt rather than
/// surfacing.
pub async fn settle(path: &Path, settings: &QuiescenceSettings) -> Quiescence {
    let mut last_size: Option<u64> = None;

    for attempt in 0..settings.max_attempts {
        let size = match std::fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Quiescence::Gone,
            Err(_) => {
                tokio::time::sleep(settings.interval()).await;
                continue;
            }
        };

        match last_size {
            Some(prev) if prev == size => {
                if probe_read(path, size).is_ok() && is_writable(path) {
                    return Quiescence::Stable;
                }
                // Still locked or mid-flush, keep waiting
            }
            _ => {
                trace!(
                    attempt,
                    size,
                    "Observed size for {}, waiting for it to hold",
                    path.display()
                );
                last_size = Some(size);
            }
        }

        tokio::time::sleep(settings.interval()).await;
    }

    Quiescence::TimedOut
}

/// Read a window from the start of the file and, if the file is larger
/// than the window, from the end.
fn probe_read(path: &Path, size: u64) -> std::io::Result<()> {
    let mut file = std::fs::File::open(path)?;
    let mut buf = vec![0u8; size.min(PROBE_WINDOW) as usize];

    file.read_exact(&mut buf)?;

    if size > PROBE_WINDOW {
        file.seek(SeekFrom::End(-(PROBE_WINDOW as i64)))?;
        file.read_exact(&mut buf)?;
    }

    Ok(())
}

/// Writability by the current process is the closest portable proxy for
/// "not locked by the writer anymore".
fn is_writable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn fast_settings(max_attempts: u32) -> QuiescenceSettings {
        QuiescenceSettings {
            interval_ms: 20,
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_missing_path_is_gone() {
        let temp = TempDir::new().unwrap();
        let outcome = settle(&temp.path().join("nope.mp3"), &fast_settings(5)).await;
        assert_eq!(outcome, Quiescence::Gone);
    }

    #[tokio::test]
    async fn test_stable_file_settles() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("done.mp3");
        std::fs::write(&path, vec![7u8; 4096]).unwrap();

        let outcome = settle(&path, &fast_settings(5)).await;
        assert_eq!(outcome, Quiescence::Stable);
    }

    #[tokio::test]
    async fn test_small_file_settles() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tiny.mp3");
        std::fs::write(&path, b"riff").unwrap();

        let outcome = settle(&path, &fast_settings(5)).await;
        assert_eq!(outcome, Quiescence::Stable);
    }

    #[tokio::test]
    async fn test_growing_file_times_out() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("growing.mp3");
        std::fs::write(&path, b"start").unwrap();

        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            for _ in 0..200 {
                let mut file = std::fs::OpenOptions::new()
                    .append(true)
                    .open(&writer_path)
                    .unwrap();
                file.write_all(&[0u8; 64]).unwrap();
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        });

        let outcome = settle(&path, &fast_settings(5)).await;
        writer.abort();

        assert_eq!(outcome, Quiescence::TimedOut);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unwritable_file_times_out() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("locked.mp3");
        std::fs::write(&path, vec![7u8; 64]).unwrap();

        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&path, perms).unwrap();

        let outcome = settle(&path, &fast_settings(4)).await;
        assert_eq!(outcome, Quiescence::TimedOut);
    }
}
