//! Participant roster. Display names are kept as typed (trimmed) while every
//! lookup and uniqueness check goes through a canonical key, so "Alice" and
//! "alice " are the same person as far as the session is concerned.

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Words the reveal prompt treats as commands; they can never be names.
pub const RESERVED_WORDS: [&str; 3] = ["exit", "quit", "cancel"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("names collide once case and spacing are ignored: {}", describe_collisions(.collisions))]
    DuplicateCanonicalName { collisions: Vec<NameCollision> },
    #[error("reserved words cannot be used as names: {}", .names.join(", "))]
    ReservedName { names: Vec<String> },
}

/// Normalized form of a display name: NFKC, whitespace collapsed, lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn from_display(raw: &str) -> Self {
        let normalized: String = raw.nfkc().collect();
        let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
        Self(collapsed.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    display: String,
    key: CanonicalKey,
}

impl Participant {
    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn key(&self) -> &CanonicalKey {
        &self.key
    }
}

/// A group of display names that share one canonical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    pub key: CanonicalKey,
    pub names: Vec<String>,
    suggestions: Vec<String>,
}

impl NameCollision {
    /// Numbered variants that collide neither with each other nor with any
    /// other name on the list.
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }
}

/// Appends the lowest free number to `name`, claiming its key in `taken`.
fn numbered_variant(
    name: &str,
    counter: &mut usize,
    taken: &mut HashSet<CanonicalKey>,
) -> String {
    loop {
        let candidate = format!("{name} {counter}");
        *counter += 1;
        if taken.insert(CanonicalKey::from_display(&candidate)) {
            return candidate;
        }
    }
}

fn describe_collisions(collisions: &[NameCollision]) -> String {
    collisions
        .iter()
        .map(|c| c.names.join(" / "))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Splits a comma-separated line into trimmed, non-empty names.
pub fn parse_name_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ordered participant list with a unique canonical key per entry.
#[derive(Debug, Clone)]
pub struct Roster {
    participants: Vec<Participant>,
    index: HashMap<CanonicalKey, usize>,
}

impl Roster {
    /// Builds a roster in entry order. Exact repeats of a trimmed name are
    /// dropped; distinct names sharing a canonical key are rejected.
    pub fn from_names<I, S>(names: I) -> Result<Self, RosterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen_display = HashSet::new();
        let mut participants = Vec::new();
        let mut reserved = Vec::new();

        for raw in names {
            let display = raw.as_ref().trim();
            if display.is_empty() || !seen_display.insert(display.to_string()) {
                continue;
            }
            let key = CanonicalKey::from_display(display);
            if RESERVED_WORDS.contains(&key.as_str()) {
                reserved.push(display.to_string());
                continue;
            }
            participants.push(Participant {
                display: display.to_string(),
                key,
            });
        }

        if !reserved.is_empty() {
            return Err(RosterError::ReservedName { names: reserved });
        }

        let mut groups: HashMap<&CanonicalKey, Vec<&str>> = HashMap::new();
        for participant in &participants {
            groups
                .entry(&participant.key)
                .or_default()
                .push(&participant.display);
        }

        let mut taken: HashSet<CanonicalKey> =
            participants.iter().map(|p| p.key.clone()).collect();
        let mut collisions: Vec<NameCollision> = Vec::new();
        for participant in &participants {
            let group = &groups[&participant.key];
            if group.len() > 1 && !collisions.iter().any(|c| c.key == participant.key) {
                let mut counter = 1;
                let suggestions = group
                    .iter()
                    .map(|name| numbered_variant(name, &mut counter, &mut taken))
                    .collect();
                collisions.push(NameCollision {
                    key: participant.key.clone(),
                    names: group.iter().map(|name| name.to_string()).collect(),
                    suggestions,
                });
            }
        }
        if !collisions.is_empty() {
            return Err(RosterError::DuplicateCanonicalName { collisions });
        }

        let index = participants
            .iter()
            .enumerate()
            .map(|(idx, participant)| (participant.key.clone(), idx))
            .collect();
        Ok(Self {
            participants,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, index: usize) -> Option<&Participant> {
        self.participants.get(index)
    }

    pub fn keys(&self) -> Vec<CanonicalKey> {
        self.participants.iter().map(|p| p.key.clone()).collect()
    }

    pub fn index_of(&self, key: &CanonicalKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Resolves whatever a participant typed at the prompt.
    pub fn resolve(&self, typed: &str) -> Option<usize> {
        self.index_of(&CanonicalKey::from_display(typed))
    }
}
