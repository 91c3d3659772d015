//! Content hashing for prompts.

use std::fmt::Write;

use sha2::{Digest, Sha256};

/// Compute a stable lowercase SHA-256 hex digest of a prompt string.
///
/// Used both to fingerprint system prompts in logs and as the content
/// address of cached renders.
pub fn hash_prompt(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    digest
        .iter()
        .fold(String::with_capacity(digest.len() * 2), |mut hex, byte| {
            let _ = write!(hex, "{:02x}", byte);
            hex
        })
}

#[cfg(test)]
mod tests {
    use super::hash_prompt;

    #[test]
    fn test_hash_prompt_stable() {
        let first = hash_prompt("a sunset over mountains");
        let second = hash_prompt("a sunset over mountains");
        let different = hash_prompt("a sunrise over mountains");

        assert_eq!(first, second);
        assert_ne!(first, different);
    }

    #[test]
    fn test_hash_prompt_known_digest() {
        assert_eq!(
            hash_prompt(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(hash_prompt("x").len(), 64);
    }
}
