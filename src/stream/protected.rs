use salsa20::cipher::{KeyIvInit, StreamCipher};
use salsa20::Salsa20;
use sha2::{Digest, Sha256};

/// Fixed nonce for the protected value stream, shared by all KDBX3 archives.
pub(crate) const SALSA20_IV: [u8; 8] = [0xe8, 0x30, 0x09, 0x4b, 0x97, 0x20, 0x5d, 0x2a];

/// Single-consumer keystream cursor for protected values.
///
/// Protected values are XOR-masked with one Salsa20 keystream advanced in
/// document order over the whole inner XML. The cursor is created once per
/// unlock, handed to the XML decoder, and never reused or re-seeded; any
/// out-of-order consumption corrupts every later value.
pub(crate) struct ProtectedStream {
    cipher: Salsa20,
}

impl ProtectedStream {
    pub(crate) fn new(inner_stream_key: &[u8; 32]) -> ProtectedStream {
        let key = Sha256::digest(inner_stream_key);
        ProtectedStream {
            cipher: Salsa20::new(&key, &SALSA20_IV.into()),
        }
    }

    /// Recover the plaintext of the next protected value in document order.
    ///
    /// Consumes exactly as many keystream bytes as the decoded value is
    /// long; an empty value consumes nothing.
    pub(crate) fn decrypt_next(&mut self, base64_value: &str) -> Option<String> {
        let mut data = base64::decode(base64_value).ok()?;
        self.cipher.apply_keystream(&mut data);
        String::from_utf8(data).ok()
    }

    /// Mask a plaintext value, advancing the keystream. Inverse of
    /// [`decrypt_next`], used to produce fixture documents in tests.
    ///
    /// [`decrypt_next`]: #method.decrypt_next
    #[cfg(test)]
    pub(crate) fn encrypt_next(&mut self, plaintext: &str) -> String {
        let mut data = plaintext.as_bytes().to_vec();
        self.cipher.apply_keystream(&mut data);
        base64::encode(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrypts_values_in_document_order() {
        let key = [0x44u8; 32];
        let mut writer = ProtectedStream::new(&key);
        let first = writer.encrypt_next("alpha");
        let second = writer.encrypt_next("beta");

        let mut reader = ProtectedStream::new(&key);
        assert_eq!(reader.decrypt_next(&first).unwrap(), "alpha");
        assert_eq!(reader.decrypt_next(&second).unwrap(), "beta");
    }

    #[test]
    fn empty_value_consumes_no_keystream() {
        let key = [0x44u8; 32];
        let mut writer = ProtectedStream::new(&key);
        let first = writer.encrypt_next("alpha");

        let mut reader = ProtectedStream::new(&key);
        assert_eq!(reader.decrypt_next("").unwrap(), "");
        assert_eq!(reader.decrypt_next(&first).unwrap(), "alpha");
    }

    #[test]
    fn out_of_order_consumption_corrupts() {
        let key = [0x44u8; 32];
        let mut writer = ProtectedStream::new(&key);
        let first = writer.encrypt_next("alpha");
        let second = writer.encrypt_next("beta");

        let mut reader = ProtectedStream::new(&key);
        let swapped = reader.decrypt_next(&second);
        assert_ne!(swapped.as_deref(), Some("beta"));
        let _ = first;
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let mut reader = ProtectedStream::new(&[0u8; 32]);
        assert!(reader.decrypt_next("not base64!!!").is_none());
    }
}
