//! The interactive run loop. A `Session` owns everything sensitive for one
//! run: roster, assignments, view counters and backup password. Cleanup of
//! temporary files and the screen happens on every way out of `run`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::backup::write_archive;
use crate::config::{ClearMode, Settings};
use crate::crypto::integrity::sha256_file;
use crate::crypto::shares::{split, SecretShares};
use crate::crypto::vault::SecretVault;
use crate::derangement::{Assignments, DerangementError};
use crate::menu::{run_menu, MenuOutcome};
use crate::reveal::{RevealError, RevealGate, RevealPolicy};
use crate::roster::{parse_name_list, Roster, RosterError};
use crate::scratch::{write_snapshot, Janitor, ScratchError};
use crate::terminal::Console;

const EXIT_WORDS: [&str; 2] = ["exit", "quit"];
const CANCEL_WORDS: [&str; 3] = ["cancel", "abort", "back"];

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Setup(#[from] DerangementError),
    #[error(transparent)]
    Scratch(#[from] ScratchError),
    #[error("terminal i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("session ended before assignments were made")]
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub participants: usize,
    pub reveals: u32,
    pub archive: Option<PathBuf>,
}

/// Seeded runs are reproducible; unseeded runs draw the seed from the OS.
pub fn session_rng(seed: Option<u64>) -> ChaCha8Rng {
    seed.map(ChaCha8Rng::seed_from_u64)
        .unwrap_or_else(ChaCha8Rng::from_entropy)
}

pub struct Session<R, W> {
    console: Console<R, W>,
    settings: Settings,
    janitor: Janitor,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(console: Console<R, W>, settings: Settings, janitor: Janitor) -> Self {
        Self {
            console,
            settings,
            janitor,
        }
    }

    pub fn run(&mut self) -> Result<SessionSummary, SessionError> {
        let result = self.run_inner();

        for err in self.janitor.sweep() {
            warn!(error = %err, "temporary file cleanup failed");
        }
        if let Err(err) = self.console.clear() {
            warn!(error = %err, "final screen clear failed");
        }
        if result.is_ok() {
            // Best effort; the session is already over.
            let _ = self
                .console
                .say("Session closed. Temporary file removed. Happy holidays!");
        }
        result
    }

    pub fn into_console(self) -> Console<R, W> {
        self.console
    }

    fn run_inner(&mut self) -> Result<SessionSummary, SessionError> {
        self.console.say("Secret Santa Trustee")?;
        if !self.settings.skip_menu
            && run_menu(&mut self.console, &mut self.settings)? == MenuOutcome::Abort
        {
            return Err(SessionError::Aborted);
        }

        let roster = self.collect_roster()?.ok_or(SessionError::Aborted)?;
        let mut rng = session_rng(self.settings.seed);
        let assignments = Assignments::for_roster(&roster, &mut rng)?;
        info!(participants = roster.len(), seeded = self.settings.seed.is_some(), "assignments generated");

        let vault = SecretVault::ephemeral();
        write_snapshot(
            &self.settings.scratch_dir,
            &vault,
            &roster,
            &assignments,
            &self.janitor,
        )?;

        let (shares, archive) = if self.settings.backup {
            let shares = split(roster.len(), &mut rng);
            match self.write_backup(&roster, &assignments, &shares)? {
                Some(path) => (Some(shares), Some(path)),
                None => (None, None),
            }
        } else {
            (None, None)
        };

        let reveals = self.reveal_loop(&roster, &assignments, shares.as_ref())?;
        Ok(SessionSummary {
            participants: roster.len(),
            reveals,
            archive,
        })
    }

    /// Prompts until the name list has no collisions. `None` on end of input.
    fn collect_roster(&mut self) -> Result<Option<Roster>, SessionError> {
        loop {
            self.console
                .say("Enter all participant names, comma-separated (at least 2):")?;
            let Some(raw) = self.console.prompt("> ")? else {
                return Ok(None);
            };
            match Roster::from_names(parse_name_list(&raw)) {
                Ok(roster) => return Ok(Some(roster)),
                Err(RosterError::DuplicateCanonicalName { collisions }) => {
                    info!(groups = collisions.len(), "name list rejected: canonical collision");
                    self.console
                        .say("Some names only differ by case or spacing, so nobody could tell them apart:")?;
                    for collision in &collisions {
                        self.console.say(format!(
                            "  {}  (for example: {})",
                            collision.names.join(" / "),
                            collision.suggestions().join(", ")
                        ))?;
                    }
                    self.console.say("Please enter the list again with distinct names.")?;
                }
                Err(err @ RosterError::ReservedName { .. }) => {
                    self.console.say(format!("{err}. Please enter the list again."))?;
                }
            }
        }
    }

    /// Writes the archive and tells the organizer where it is. A failed write
    /// is reported and the session carries on without a backup.
    fn write_backup(
        &mut self,
        roster: &Roster,
        assignments: &Assignments,
        shares: &SecretShares,
    ) -> Result<Option<PathBuf>, SessionError> {
        let at = OffsetDateTime::now_utc().to_offset(self.settings.local_offset);
        let path = match write_archive(
            &self.settings.archive_dir,
            at,
            roster,
            assignments,
            shares.secret(),
            &self.janitor,
        ) {
            Ok(path) => path,
            Err(err) => {
                warn!(error = %err, "backup archive not written");
                self.console.say(format!(
                    "Backup could not be written ({err}). Continuing without a backup."
                ))?;
                return Ok(None);
            }
        };

        self.console
            .say(format!("Encrypted backup written to {}", path.display()))?;
        match sha256_file(&path) {
            Ok(digest) => self.console.say(format!("SHA-256: {digest}"))?,
            Err(err) => warn!(error = %err, "archive fingerprint unavailable"),
        }
        self.console.say(format!(
            "Its password is split into {} segments; each person sees one during their reveal.",
            shares.len()
        ))?;
        self.console
            .say("To open it later, join every segment in order (segment 1 first).")?;
        if self.console.prompt("(Press Enter to start the private reveals)")?.is_none() {
            debug!("end of input before reveals");
        }
        Ok(Some(path))
    }

    fn reveal_loop(
        &mut self,
        roster: &Roster,
        assignments: &Assignments,
        shares: Option<&SecretShares>,
    ) -> Result<u32, SessionError> {
        let mut gate = RevealGate::new(roster.len(), self.settings.policy);

        self.console.clear()?;
        self.console.say("Assignments generated. Private reveal mode started.")?;
        self.console
            .say("Type your NAME to see whom you gift to (case-insensitive).")?;
        self.console
            .say("Type 'exit' or 'quit' to end (temporary file will be deleted).")?;

        loop {
            if gate.policy() == RevealPolicy::OneShot && gate.remaining() == 0 {
                self.console.say("\nEveryone has seen their assignment.")?;
                break;
            }

            let Some(typed) = self.console.prompt("\nEnter your name: ")? else {
                self.console.say("\nEnd of input. Exiting.")?;
                break;
            };
            if typed.is_empty() {
                self.console.say("Please enter a non-empty name.")?;
                continue;
            }
            if is_one_of(&typed, &EXIT_WORDS) {
                break;
            }

            let index = match gate.check(&typed, roster) {
                Ok(index) => index,
                Err(err) => {
                    self.deny(&err)?;
                    continue;
                }
            };
            let name = roster
                .participant(index)
                .map(|p| p.display().to_string())
                .unwrap_or_default();

            let confirm = self.console.prompt(&format!(
                "{name}, make sure nobody else can see the screen, then press Enter (or type 'cancel'): "
            ))?;
            match confirm {
                None => {
                    self.console.say("\nCancelled; nothing was revealed.")?;
                    break;
                }
                Some(answer) if is_one_of(&answer, &CANCEL_WORDS) => {
                    self.console.say("Cancelled; nothing was revealed.")?;
                    continue;
                }
                Some(_) => {}
            }

            let reveal = match gate.lookup(&typed, roster, assignments, shares) {
                Ok(reveal) => reveal,
                Err(err) => {
                    self.deny(&err)?;
                    continue;
                }
            };
            info!(views = reveal.views, remaining = gate.remaining(), "assignment revealed");

            self.console.clear()?;
            self.console
                .say(format!("*** ONLY FOR {} ***", reveal.giver.display()))?;
            self.console
                .say(format!("You will gift to: {}", reveal.recipient.display()))?;
            if let Some(segment) = reveal.segment {
                self.console.say(format!(
                    "Backup password segment {} of {}: {}",
                    segment.position(),
                    segment.total(),
                    segment.digits()
                ))?;
                self.console
                    .say("Keep it safe; the backup only opens with every segment.")?;
            }
            self.wait_then_clear()?;
        }

        Ok(gate.total_views())
    }

    fn deny(&mut self, err: &RevealError) -> io::Result<()> {
        debug!(reason = %err, "reveal denied");
        let message = match err {
            RevealError::UnknownParticipant { .. } => {
                "Name not found. Please re-check spelling and try again."
            }
            RevealError::AlreadyViewed { .. } => "You have already viewed your assignment.",
            RevealError::MissingAssignment { .. } => {
                "No assignment is recorded for that name. Please tell the organizer."
            }
        };
        self.console.say(message)
    }

    fn wait_then_clear(&mut self) -> io::Result<()> {
        match self.settings.clear {
            ClearMode::PressEnter => {
                // End of input here still clears the screen.
                let _ = self
                    .console
                    .prompt("\n(Press Enter to clear, and pass to next person)")?;
            }
            ClearMode::AfterSeconds(0) => {
                self.console
                    .say("\n(Clearing now. Please pass the device to the next person.)")?;
            }
            ClearMode::AfterSeconds(secs) => {
                self.console.say(format!(
                    "\n(This message will be automatically cleared in {secs} seconds. \
                     Please pass the device to the next person afterward.)"
                ))?;
                thread::sleep(Duration::from_secs(secs));
            }
        }
        self.console.clear()
    }
}

fn is_one_of(input: &str, words: &[&str]) -> bool {
    let lowered = input.trim().to_lowercase();
    words.iter().any(|word| *word == lowered)
}
