//! Temporary assignment snapshot and the janitor that removes it.
//!
//! The snapshot lives in the OS temp directory only for the length of the
//! session. Its payload is sealed with the session vault, so even a leftover
//! file after a hard crash is unreadable once the process is gone.

use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tempfile::TempPath;
use thiserror::Error;
use tracing::debug;

use crate::crypto::vault::{SealedBlob, SecretVault, VaultError};
use crate::derangement::Assignments;
use crate::roster::Roster;

pub const SCRATCH_PREFIX: &str = "secret_santa_";
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ScratchError {
    #[error("temporary assignment file could not be written: {0}")]
    Write(#[source] io::Error),
    #[error("temporary assignment file {} could not be removed: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("assignment snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("assignment snapshot sealing failed: {0}")]
    Seal(#[from] VaultError),
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    version: u32,
    sealed: SealedBlob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub giver: String,
    pub recipient: String,
}

/// Writes the sealed mapping to a fresh `secret_santa_*.json` file in `dir`.
/// The file is handed to `janitor` before any byte is written, so an
/// interrupt or a failed write never leaves it behind.
pub fn write_snapshot(
    dir: &Path,
    vault: &SecretVault,
    roster: &Roster,
    assignments: &Assignments,
    janitor: &Janitor,
) -> Result<PathBuf, ScratchError> {
    let entries: Vec<SnapshotEntry> = assignments
        .index_pairs()
        .filter_map(|(giver, recipient)| {
            Some(SnapshotEntry {
                giver: roster.participant(giver)?.display().to_string(),
                recipient: roster.participant(recipient)?.display().to_string(),
            })
        })
        .collect();
    let plaintext = serde_json::to_vec(&entries)?;
    let document = SnapshotDocument {
        version: SNAPSHOT_VERSION,
        sealed: vault.seal(&plaintext)?,
    };

    // tempfile creates the file with 0600 permissions on unix.
    let (file, temp) = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .suffix(".json")
        .tempfile_in(dir)
        .map_err(ScratchError::Write)?
        .into_parts();
    let path = temp.to_path_buf();
    janitor.track(temp);

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &document)?;
    let file = writer
        .into_inner()
        .map_err(|err| ScratchError::Write(err.into_error()))?;
    file.sync_all().map_err(ScratchError::Write)?;

    debug!(path = %path.display(), entries = entries.len(), "assignment snapshot written");
    Ok(path)
}

/// Shared registry of temporary files. The run loop and the interrupt
/// watcher hold clones; whichever sweeps first removes the files.
#[derive(Clone, Default)]
pub struct Janitor {
    tracked: Arc<Mutex<Vec<TempPath>>>,
}

impl Janitor {
    pub fn track(&self, path: TempPath) {
        self.tracked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path);
    }

    /// Tracks a file created outside `tempfile`.
    pub fn track_path(&self, path: &Path) {
        self.track(TempPath::from_path(path));
    }

    /// Stops tracking `path` and leaves the file on disk.
    pub fn release(&self, path: &Path) -> bool {
        match self.take(path) {
            Some(temp) => temp.keep().is_ok(),
            None => false,
        }
    }

    /// Stops tracking `path` and deletes it now.
    pub fn remove(&self, path: &Path) -> Result<(), ScratchError> {
        let Some(temp) = self.take(path) else {
            return Ok(());
        };
        match temp.close() {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ScratchError::Cleanup {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn take(&self, path: &Path) -> Option<TempPath> {
        let mut tracked = self.tracked.lock().unwrap_or_else(PoisonError::into_inner);
        let position = tracked.iter().position(|temp| &**temp == path)?;
        Some(tracked.swap_remove(position))
    }

    pub fn tracked(&self) -> usize {
        self.tracked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deletes every tracked file. Files already gone count as removed.
    pub fn sweep(&self) -> Vec<ScratchError> {
        let drained: Vec<TempPath> = self
            .tracked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        let mut failures = Vec::new();
        for temp in drained {
            let path = temp.to_path_buf();
            match temp.close() {
                Ok(()) => debug!(path = %path.display(), "temporary file removed"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => failures.push(ScratchError::Cleanup { path, source }),
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::{write_snapshot, Janitor, SnapshotDocument, SnapshotEntry, SCRATCH_PREFIX};
    use crate::crypto::vault::{SecretVault, VaultError};
    use crate::derangement::Assignments;
    use crate::roster::Roster;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::path::Path;

    fn fixture() -> (Roster, Assignments) {
        let roster = Roster::from_names(["Alice", "Bob", "Carol", "Dan"]).expect("valid roster");
        let assignments =
            Assignments::for_roster(&roster, &mut ChaCha8Rng::seed_from_u64(5)).expect("valid");
        (roster, assignments)
    }

    fn open_snapshot(path: &Path, vault: &SecretVault) -> Result<Vec<SnapshotEntry>, VaultError> {
        let raw = std::fs::read(path).expect("snapshot readable");
        let document: SnapshotDocument = serde_json::from_slice(&raw).expect("snapshot json");
        assert_eq!(document.version, 1);
        let plaintext = vault.open(&document.sealed)?;
        Ok(serde_json::from_slice(&plaintext).expect("entries json"))
    }

    #[test]
    fn snapshot_round_trips_through_the_vault() {
        let dir = tempfile::tempdir().expect("temp dir");
        let vault = SecretVault::ephemeral();
        let janitor = Janitor::default();
        let (roster, assignments) = fixture();

        let path = write_snapshot(dir.path(), &vault, &roster, &assignments, &janitor)
            .expect("written");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(SCRATCH_PREFIX) && name.ends_with(".json"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("Alice"));

        let entries = open_snapshot(&path, &vault).expect("readable");
        assert_eq!(entries.len(), 4);
        assert!(entries.iter().all(|e| e.giver != e.recipient));
    }

    #[test]
    fn other_sessions_cannot_read_the_snapshot() {
        let dir = tempfile::tempdir().expect("temp dir");
        let janitor = Janitor::default();
        let (roster, assignments) = fixture();
        let path = write_snapshot(
            dir.path(),
            &SecretVault::ephemeral(),
            &roster,
            &assignments,
            &janitor,
        )
        .expect("written");
        let err = open_snapshot(&path, &SecretVault::ephemeral()).unwrap_err();
        assert!(matches!(err, VaultError::OpenFailed(_)));
    }

    #[cfg(unix)]
    #[test]
    fn snapshot_is_private_to_the_owner() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("temp dir");
        let janitor = Janitor::default();
        let (roster, assignments) = fixture();
        let path = write_snapshot(
            dir.path(),
            &SecretVault::ephemeral(),
            &roster,
            &assignments,
            &janitor,
        )
        .expect("written");
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn snapshot_is_tracked_as_soon_as_it_exists() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (roster, assignments) = fixture();

        let janitor = Janitor::default();
        let watcher = janitor.clone();
        let path = write_snapshot(
            dir.path(),
            &SecretVault::ephemeral(),
            &roster,
            &assignments,
            &janitor,
        )
        .expect("written");
        assert_eq!(watcher.tracked(), 1);

        assert!(watcher.sweep().is_empty());
        assert!(!path.exists());
        assert_eq!(janitor.tracked(), 0);
        assert!(janitor.sweep().is_empty());
    }

    #[test]
    fn sweeping_an_already_removed_file_is_not_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let janitor = Janitor::default();
        let (roster, assignments) = fixture();
        let path = write_snapshot(
            dir.path(),
            &SecretVault::ephemeral(),
            &roster,
            &assignments,
            &janitor,
        )
        .expect("written");
        std::fs::remove_file(&path).unwrap();
        assert!(janitor.sweep().is_empty());
    }

    #[test]
    fn released_files_survive_the_sweep_and_removed_files_do_not() {
        let dir = tempfile::tempdir().expect("temp dir");
        let kept = dir.path().join("kept.zip");
        let dropped = dir.path().join("dropped.zip");
        std::fs::write(&kept, b"keep").unwrap();
        std::fs::write(&dropped, b"drop").unwrap();

        let janitor = Janitor::default();
        janitor.track_path(&kept);
        janitor.track_path(&dropped);
        assert_eq!(janitor.tracked(), 2);

        assert!(janitor.release(&kept));
        janitor.remove(&dropped).expect("removed");
        assert!(!dropped.exists());
        assert_eq!(janitor.tracked(), 0);

        assert!(janitor.sweep().is_empty());
        assert!(kept.exists());
        assert!(!janitor.release(&kept));
        janitor.remove(&kept).expect("untracked paths are ignored");
        assert!(kept.exists());
    }
}
