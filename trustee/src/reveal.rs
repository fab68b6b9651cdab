//! Reveal gate: decides whether a typed name may see its assignment and
//! keeps the per-participant view counters for the session.

use thiserror::Error;

use crate::crypto::shares::{SecretShares, Segment};
use crate::derangement::Assignments;
use crate::roster::{Participant, Roster};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPolicy {
    /// Each participant may reveal once per session.
    OneShot,
    Repeatable,
}

impl RevealPolicy {
    pub fn from_allow_repeat(allow_repeat: bool) -> Self {
        if allow_repeat {
            RevealPolicy::Repeatable
        } else {
            RevealPolicy::OneShot
        }
    }

    pub fn allows_repeat(self) -> bool {
        matches!(self, RevealPolicy::Repeatable)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RevealError {
    #[error("no participant named {typed:?}")]
    UnknownParticipant { typed: String },
    #[error("{name} has already viewed their assignment")]
    AlreadyViewed { name: String },
    #[error("assignment table is missing an entry for {name}")]
    MissingAssignment { name: String },
}

/// What a successful lookup shows on screen.
#[derive(Debug)]
pub struct Reveal<'a> {
    pub giver: &'a Participant,
    pub recipient: &'a Participant,
    pub segment: Option<&'a Segment>,
    pub views: u32,
}

#[derive(Debug)]
pub struct RevealGate {
    policy: RevealPolicy,
    views: Vec<u32>,
}

impl RevealGate {
    pub fn new(participants: usize, policy: RevealPolicy) -> Self {
        Self {
            policy,
            views: vec![0; participants],
        }
    }

    pub fn policy(&self) -> RevealPolicy {
        self.policy
    }

    /// Resolves `typed` and applies the viewing policy without recording a
    /// view. Returns the participant's roster index.
    pub fn check(&self, typed: &str, roster: &Roster) -> Result<usize, RevealError> {
        let index = roster
            .resolve(typed)
            .filter(|&idx| idx < self.views.len())
            .ok_or_else(|| RevealError::UnknownParticipant {
                typed: typed.trim().to_string(),
            })?;
        if self.policy == RevealPolicy::OneShot && self.views[index] > 0 {
            let name = roster
                .participant(index)
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return Err(RevealError::AlreadyViewed { name });
        }
        Ok(index)
    }

    /// Authorizes a reveal and records it. Failed lookups leave the counters
    /// untouched.
    pub fn lookup<'a>(
        &mut self,
        typed: &str,
        roster: &'a Roster,
        assignments: &Assignments,
        shares: Option<&'a SecretShares>,
    ) -> Result<Reveal<'a>, RevealError> {
        let index = self.check(typed, roster)?;
        let giver = roster
            .participant(index)
            .ok_or_else(|| RevealError::UnknownParticipant {
                typed: typed.trim().to_string(),
            })?;
        let recipient = assignments
            .recipient_index(index)
            .and_then(|idx| roster.participant(idx))
            .ok_or_else(|| RevealError::MissingAssignment {
                name: giver.display().to_string(),
            })?;

        self.views[index] += 1;
        Ok(Reveal {
            giver,
            recipient,
            segment: shares.and_then(|s| s.segment(index)),
            views: self.views[index],
        })
    }

    pub fn views(&self, index: usize) -> u32 {
        self.views.get(index).copied().unwrap_or(0)
    }

    /// Participants who have not viewed their assignment yet.
    pub fn remaining(&self) -> usize {
        self.views.iter().filter(|&&count| count == 0).count()
    }

    pub fn total_views(&self) -> u32 {
        self.views.iter().sum()
    }
}
