use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Stable content identity for uploaded bytes (base64url encoded SHA-256).
pub fn content_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_and_url_safe() {
        let first = content_digest(b"poster");
        assert_eq!(first, content_digest(b"poster"));
        assert_ne!(first, content_digest(b"poster-v2"));
        assert_eq!(first.len(), 43);
        assert!(!first.contains('+') && !first.contains('/') && !first.contains('='));
    }
}
