//! Content-addressed chunk naming: a 6-byte Blake2s digest of a chunk's canonical
//! bytes, used only as a change detector, not a security property.
use blake2::digest::consts::U6;
use blake2::{Blake2s, Digest};

pub fn chunk_digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Blake2s::<U6>::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_six_bytes_hex() {
        let digest = chunk_digest_hex(b"hello");
        assert_eq!(digest.len(), 12);
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(chunk_digest_hex(b"same"), chunk_digest_hex(b"same"));
        assert_ne!(chunk_digest_hex(b"a"), chunk_digest_hex(b"b"));
    }
}
