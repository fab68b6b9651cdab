//! Backup password splitting. The password is `n` random four-digit segments
//! glued together; participant `i` is shown segment `i` and nothing else.
//!
//! This is plain n-of-n splitting, not a threshold scheme: all segments are
//! needed to rebuild the password, and a lost segment means a lost backup.

use std::fmt;

use rand::Rng;
use zeroize::Zeroize;

pub const SEGMENT_DIGITS: usize = 4;
const SEGMENT_SPACE: u16 = 10_000;

/// One participant's piece of the backup password.
#[derive(Clone, PartialEq, Eq)]
pub struct Segment {
    position: usize,
    total: usize,
    digits: String,
}

impl Segment {
    /// 1-based position of this segment in the password.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Segment({} of {}, <redacted>)", self.position, self.total)
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        self.digits.zeroize();
    }
}

/// The full backup password and its per-participant segments.
pub struct SecretShares {
    secret: String,
    segments: Vec<Segment>,
}

impl SecretShares {
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segment owned by the participant at `index` in roster order.
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Debug for SecretShares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretShares")
            .field("segments", &self.segments.len())
            .finish_non_exhaustive()
    }
}

impl Drop for SecretShares {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

/// Draws `participant_count` uniform segments from `rng` and concatenates them
/// in draw order.
pub fn split<R: Rng + ?Sized>(participant_count: usize, rng: &mut R) -> SecretShares {
    let mut secret = String::with_capacity(participant_count * SEGMENT_DIGITS);
    let mut segments = Vec::with_capacity(participant_count);
    for idx in 0..participant_count {
        let digits = format!("{:04}", rng.gen_range(0..SEGMENT_SPACE));
        secret.push_str(&digits);
        segments.push(Segment {
            position: idx + 1,
            total: participant_count,
            digits,
        });
    }
    SecretShares { secret, segments }
}

#[cfg(test)]
mod tests {
    use super::{split, SEGMENT_DIGITS};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn three_participants_get_twelve_digits() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let shares = split(3, &mut rng);
        assert_eq!(shares.secret().len(), 12);
        assert_eq!(shares.len(), 3);
        for (idx, segment) in shares.segments().iter().enumerate() {
            assert_eq!(segment.digits().len(), SEGMENT_DIGITS);
            assert!(segment.digits().chars().all(|c| c.is_ascii_digit()));
            assert_eq!(segment.position(), idx + 1);
            assert_eq!(segment.total(), 3);
        }
        let rebuilt: String = shares.segments().iter().map(|s| s.digits()).collect();
        assert_eq!(rebuilt, shares.secret());
    }

    #[test]
    fn same_seed_same_password() {
        let first = split(5, &mut ChaCha8Rng::seed_from_u64(99));
        let second = split(5, &mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(first.secret(), second.secret());
        assert_eq!(first.segments(), second.segments());
    }

    #[test]
    fn zero_participants_yield_empty_secret() {
        let shares = split(0, &mut ChaCha8Rng::seed_from_u64(0));
        assert!(shares.is_empty());
        assert_eq!(shares.secret(), "");
    }

    #[test]
    fn debug_output_hides_digits() {
        let shares = split(2, &mut ChaCha8Rng::seed_from_u64(11));
        let digits = shares.segment(0).unwrap().digits().to_string();
        let rendered = format!("{:?} {:?}", shares, shares.segments());
        assert!(!rendered.contains(&digits));
        assert!(rendered.contains("redacted"));
    }

    proptest! {
        #[test]
        fn segments_concatenate_to_secret(n in 1usize..64, seed in any::<u64>()) {
            let shares = split(n, &mut ChaCha8Rng::seed_from_u64(seed));
            prop_assert_eq!(shares.secret().len(), SEGMENT_DIGITS * n);
            let rebuilt: String = shares.segments().iter().map(|s| s.digits()).collect();
            prop_assert_eq!(rebuilt.as_str(), shares.secret());
        }
    }
}
