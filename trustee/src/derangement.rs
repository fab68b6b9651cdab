//! Gift assignment generation. Every giver receives exactly one recipient,
//! every recipient has exactly one giver, and nobody draws themselves.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::roster::{CanonicalKey, Roster};

pub const MIN_PARTICIPANTS: usize = 2;

/// Shuffles tried before falling back to a cyclic shift. A uniform shuffle is
/// a derangement with probability ~1/e, so 64 misses in a row is ~1e-13.
pub const MAX_SHUFFLE_ATTEMPTS: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DerangementError {
    #[error("need at least 2 distinct participants, got {found}")]
    InsufficientParticipants { found: usize },
    #[error("participant {0} appears more than once")]
    DuplicateKey(CanonicalKey),
}

/// A derangement over an ordered key list. `recipients[i]` is the index of
/// the person giver `i` buys for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignments {
    keys: Vec<CanonicalKey>,
    recipients: Vec<usize>,
}

impl Assignments {
    /// Draws a derangement over `keys`. The result depends only on the key
    /// order and the state of `rng`, so a seeded rng reproduces it exactly.
    pub fn generate<R: Rng + ?Sized>(
        keys: &[CanonicalKey],
        rng: &mut R,
    ) -> Result<Self, DerangementError> {
        let mut unique = HashSet::with_capacity(keys.len());
        for key in keys {
            if !unique.insert(key) {
                return Err(DerangementError::DuplicateKey(key.clone()));
            }
        }
        if keys.len() < MIN_PARTICIPANTS {
            return Err(DerangementError::InsufficientParticipants { found: keys.len() });
        }

        Ok(Self {
            keys: keys.to_vec(),
            recipients: derange(keys.len(), rng),
        })
    }

    pub fn for_roster<R: Rng + ?Sized>(roster: &Roster, rng: &mut R) -> Result<Self, DerangementError> {
        Self::generate(&roster.keys(), rng)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn recipient_index(&self, giver: usize) -> Option<usize> {
        self.recipients.get(giver).copied()
    }

    pub fn recipient_of(&self, giver: &CanonicalKey) -> Option<&CanonicalKey> {
        let idx = self.keys.iter().position(|key| key == giver)?;
        self.keys.get(self.recipients[idx])
    }

    /// Giver/recipient pairs in key order.
    pub fn pairs(&self) -> impl Iterator<Item = (&CanonicalKey, &CanonicalKey)> + '_ {
        self.keys
            .iter()
            .zip(self.recipients.iter())
            .map(move |(giver, &recipient)| (giver, &self.keys[recipient]))
    }

    pub fn index_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.recipients.iter().copied().enumerate()
    }

    /// True when the mapping is a permutation with no fixed point.
    pub fn is_derangement(&self) -> bool {
        let mut hit = vec![false; self.recipients.len()];
        for (giver, &recipient) in self.recipients.iter().enumerate() {
            if recipient == giver || recipient >= hit.len() || hit[recipient] {
                return false;
            }
            hit[recipient] = true;
        }
        self.recipients.len() == self.keys.len()
    }
}

fn derange<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    if n == 2 {
        return vec![1, 0];
    }

    let mut candidate: Vec<usize> = (0..n).collect();
    for attempt in 1..=MAX_SHUFFLE_ATTEMPTS {
        candidate.shuffle(rng);
        if has_no_fixed_point(&candidate) {
            debug!(participants = n, attempt, "derangement accepted");
            return candidate;
        }
    }

    warn!(
        participants = n,
        attempts = MAX_SHUFFLE_ATTEMPTS,
        "shuffle budget exhausted; using cyclic shift"
    );
    cyclic_shift(n, rng)
}

fn has_no_fixed_point(candidate: &[usize]) -> bool {
    candidate.iter().enumerate().all(|(idx, &value)| idx != value)
}

/// Shuffles the circle order, then has everyone give to the next person in it.
fn cyclic_shift<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let mut recipients = vec![0; n];
    for (pos, &giver) in order.iter().enumerate() {
        recipients[giver] = order[(pos + 1) % n];
    }
    recipients
}
