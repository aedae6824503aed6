use crate::binary::errors::UnlockError;
use crate::crypto::MasterKey;
use aes::Aes256;
use cipher::block_padding::Pkcs7;
use cipher::{BlockDecryptMut, KeyIvInit};
use zeroize::Zeroizing;

type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES-256-CBC decrypt the payload and strip the PKCS#7 padding.
///
/// Length and padding failures are reported as `InvalidPassword`; with a
/// valid archive the overwhelmingly likely cause is wrong credentials.
pub(crate) fn decrypt_payload(
    ciphertext: &[u8],
    key: &MasterKey,
    iv: &[u8; 16],
) -> Result<Zeroizing<Vec<u8>>, UnlockError> {
    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(UnlockError::InvalidPassword);
    }
    let cipher = Aes256CbcDec::new(&key.0.into(), iv.into());
    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    let len = cipher
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| UnlockError::InvalidPassword)?
        .len();
    buffer.truncate(len);
    Ok(buffer)
}
