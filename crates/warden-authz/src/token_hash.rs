use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Derive the lookup hash for an API-token secret.
///
/// The first 10 bytes of the secret are kept verbatim and followed by the
/// first 6 bytes of `SHA-256(secret)`. The verbatim part keeps the value
/// indexable; the hashed suffix prevents recovering the secret from the
/// stored value alone. Only suitable for high-entropy random secrets.
pub fn hash_token_id(secret: Uuid) -> Uuid {
    let bytes = secret.as_bytes();
    let sum = Sha256::digest(bytes);
    let mut output = [0u8; 16];
    output[..10].copy_from_slice(&bytes[..10]);
    output[10..].copy_from_slice(&sum[..6]);
    Uuid::from_bytes(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let secret = Uuid::new_v4();
        assert_eq!(hash_token_id(secret), hash_token_id(secret));
    }

    #[test]
    fn hash_keeps_ten_verbatim_bytes() {
        let secret = Uuid::new_v4();
        let hashed = hash_token_id(secret);
        assert_eq!(&hashed.as_bytes()[..10], &secret.as_bytes()[..10]);
        assert_ne!(hashed, secret);
    }

    #[test]
    fn shared_prefix_still_yields_distinct_hashes() {
        let mut a = [7u8; 16];
        let mut b = [7u8; 16];
        a[15] = 1;
        b[15] = 2;
        let ha = hash_token_id(Uuid::from_bytes(a));
        let hb = hash_token_id(Uuid::from_bytes(b));
        assert_eq!(&ha.as_bytes()[..10], &hb.as_bytes()[..10]);
        assert_ne!(ha, hb);
    }

    #[test]
    fn matches_known_vector() {
        let secret = Uuid::nil();
        let sum = Sha256::digest([0u8; 16]);
        let hashed = hash_token_id(secret);
        assert_eq!(&hashed.as_bytes()[10..], &sum[..6]);
    }
}
