//! Encrypted backup of the full assignment list.
//!
//! The archive is a regular zip with WinZip AES-256 entries, so 7-Zip and
//! friends can open it once everyone's segments are put back together.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{info, warn};
use zip::write::FileOptions;
use zip::{AesMode, CompressionMethod, ZipWriter};

use crate::derangement::Assignments;
use crate::roster::Roster;
use crate::scratch::Janitor;

pub const ARCHIVE_PREFIX: &str = "secret_santa_";
pub const JSON_ENTRY: &str = "assignments.json";
pub const TEXT_ENTRY: &str = "assignments.txt";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("archive {} could not be created: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("archive timestamp formatting failed: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("assignment encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("zip write failed: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("archive write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("assignments do not match the roster")]
    RosterMismatch,
}

#[derive(Debug, Serialize)]
struct ArchiveDocument<'a> {
    generated_at: String,
    participants: usize,
    assignments: Vec<ArchiveEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct ArchiveEntry<'a> {
    giver: &'a str,
    recipient: &'a str,
}

/// `secret_santa_<YYYYMMDD>_<HHMMSS>.zip` for the given instant.
pub fn archive_file_name(at: OffsetDateTime) -> Result<String, BackupError> {
    let stamp = at.format(format_description!("[year][month][day]_[hour][minute][second]"))?;
    Ok(format!("{ARCHIVE_PREFIX}{stamp}.zip"))
}

/// Writes the archive into `dir` and returns its path. An existing file with
/// the same name is never overwritten. Until the archive is complete it is
/// tracked by `janitor`, so an error or an interrupt removes the partial file.
pub fn write_archive(
    dir: &Path,
    at: OffsetDateTime,
    roster: &Roster,
    assignments: &Assignments,
    password: &str,
    janitor: &Janitor,
) -> Result<PathBuf, BackupError> {
    let entries = archive_entries(roster, assignments)?;
    let document = ArchiveDocument {
        generated_at: at.format(&Rfc3339)?,
        participants: entries.len(),
        assignments: entries,
    };
    let json = serde_json::to_vec_pretty(&document)?;
    let text = render_text(&document);

    let path = dir.join(archive_file_name(at)?);
    let file = File::options()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|source| BackupError::Create {
            path: path.clone(),
            source,
        })?;
    janitor.track_path(&path);

    match fill_archive(file, password, &json, text.as_bytes()) {
        Ok(()) => {
            janitor.release(&path);
            info!(path = %path.display(), participants = document.participants, "backup archive written");
            Ok(path)
        }
        Err(err) => {
            if let Err(remove_err) = janitor.remove(&path) {
                warn!(error = %remove_err, "partial archive left behind");
            }
            Err(err)
        }
    }
}

fn fill_archive(file: File, password: &str, json: &[u8], text: &[u8]) -> Result<(), BackupError> {
    let mut zip = ZipWriter::new(file);
    zip.start_file(JSON_ENTRY, entry_options(password))?;
    zip.write_all(json)?;
    zip.start_file(TEXT_ENTRY, entry_options(password))?;
    zip.write_all(text)?;
    let file = zip.finish()?;
    file.sync_all()?;
    Ok(())
}

fn entry_options(password: &str) -> FileOptions<'_, ()> {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .with_aes_encryption(AesMode::Aes256, password)
}

fn archive_entries<'a>(
    roster: &'a Roster,
    assignments: &Assignments,
) -> Result<Vec<ArchiveEntry<'a>>, BackupError> {
    if roster.len() != assignments.len() {
        return Err(BackupError::RosterMismatch);
    }
    assignments
        .index_pairs()
        .map(|(giver, recipient)| {
            let giver = roster.participant(giver).ok_or(BackupError::RosterMismatch)?;
            let recipient = roster
                .participant(recipient)
                .ok_or(BackupError::RosterMismatch)?;
            Ok(ArchiveEntry {
                giver: giver.display(),
                recipient: recipient.display(),
            })
        })
        .collect()
}

fn render_text(document: &ArchiveDocument<'_>) -> String {
    let mut out = format!(
        "Secret Santa assignments ({} participants, generated {})\n\n",
        document.participants, document.generated_at
    );
    for entry in &document.assignments {
        out.push_str(&format!("{} -> {}\n", entry.giver, entry.recipient));
    }
    out
}
