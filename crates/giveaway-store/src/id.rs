//! Random identifiers.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of public sweepstakes identifiers.
pub const SWEEPSTAKES_ID_LEN: usize = 6;

/// Returns a random alphanumeric identifier of `len` characters.
#[must_use]
pub fn random_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Returns a six-character sweepstakes identifier.
#[must_use]
pub fn sweepstakes_id() -> String {
    random_id(SWEEPSTAKES_ID_LEN)
}

/// Returns a prefixed identifier such as `team_k3J9x0aQ2m`.
#[must_use]
pub fn prefixed_id(prefix: &str) -> String {
    format!("{prefix}_{}", random_id(10))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sweepstakes_id_shape() {
        let id = sweepstakes_id();
        assert_eq!(id.len(), SWEEPSTAKES_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_prefixed_id() {
        let id = prefixed_id("entry");
        assert!(id.starts_with("entry_"));
        assert_eq!(id.len(), "entry_".len() + 10);
    }

    proptest! {
        #[test]
        fn prop_random_id_length(len in 0usize..64) {
            let id = random_id(len);
            prop_assert_eq!(id.len(), len);
            prop_assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
