//! Near-duplicate detection over perceptual fingerprints.
//!
//! A pure predicate: the caller supplies the prior fingerprints, already
//! scoped to the relevant partition and recency window. No time or key
//! filtering happens here.

use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;

/// What a positive duplicate match does to the item's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// A duplicate forces the final status to FAIL regardless of the rule
    /// outcome. Historical default.
    #[default]
    OverrideToFail,
    /// A duplicate only sets the `is_duplicate` flag; the rule verdict stands.
    FlagOnly,
}

/// Returns true iff at least one prior fingerprint is within `threshold`
/// Hamming distance of `candidate`. Short-circuits on the first match.
///
/// Priors of an incomparable width are skipped with a warning; a legacy row
/// must not take down duplicate detection for the whole partition.
pub fn is_duplicate(candidate: &Fingerprint, priors: &[Fingerprint], threshold: u32) -> bool {
    for prior in priors {
        match candidate.hamming_distance(prior) {
            Ok(distance) if distance <= threshold => return true,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Skipping incomparable prior fingerprint");
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(bytes: [u8; 8]) -> Fingerprint {
        Fingerprint::from_bytes(bytes.to_vec())
    }

    #[test]
    fn empty_priors_is_not_a_duplicate() {
        assert!(!is_duplicate(&fp([0; 8]), &[], 10));
    }

    #[test]
    fn match_within_threshold() {
        let candidate = fp([0; 8]);
        let priors = vec![fp([0xFF; 8]), fp([0x03, 0, 0, 0, 0, 0, 0, 0])];

        // Second prior is 2 bits away.
        assert!(is_duplicate(&candidate, &priors, 2));
    }

    #[test]
    fn no_prior_within_threshold() {
        let candidate = fp([0; 8]);
        let priors = vec![fp([0x07, 0, 0, 0, 0, 0, 0, 0])]; // 3 bits away

        assert!(!is_duplicate(&candidate, &priors, 2));
    }

    #[test]
    fn exact_threshold_counts_as_duplicate() {
        let candidate = fp([0; 8]);
        let priors = vec![fp([0x07, 0, 0, 0, 0, 0, 0, 0])]; // 3 bits away

        assert!(is_duplicate(&candidate, &priors, 3));
    }

    #[test]
    fn prior_order_does_not_change_the_answer() {
        let candidate = fp([0; 8]);
        let near = fp([0x01, 0, 0, 0, 0, 0, 0, 0]);
        let far = fp([0xFF; 8]);

        assert!(is_duplicate(&candidate, &[near.clone(), far.clone()], 5));
        assert!(is_duplicate(&candidate, &[far, near], 5));
    }

    #[test]
    fn incomparable_priors_are_skipped() {
        let candidate = fp([0; 8]);
        let legacy = Fingerprint::from_bytes(vec![0x00; 5]);
        let near = fp([0x01, 0, 0, 0, 0, 0, 0, 0]);

        assert!(is_duplicate(&candidate, &[legacy.clone(), near], 5));
        assert!(!is_duplicate(&candidate, &[legacy], 5));
    }

    #[test]
    fn duplicate_policy_default_overrides() {
        assert_eq!(DuplicatePolicy::default(), DuplicatePolicy::OverrideToFail);
    }
}
