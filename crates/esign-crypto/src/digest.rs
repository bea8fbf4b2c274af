use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compare two hex digests, ignoring ASCII case.
pub fn digests_match(expected: &str, actual: &str) -> bool {
    expected.len() == actual.len() && expected.eq_ignore_ascii_case(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn output_is_64_lowercase_hex_chars() {
        let digest = sha256_hex(b"");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn match_ignores_case_only() {
        let digest = sha256_hex(b"doc");
        assert!(digests_match(&digest, &digest.to_uppercase()));
        assert!(!digests_match(&digest, &sha256_hex(b"doc2")));
        assert!(!digests_match(&digest, &digest[..10]));
    }
}
