use super::{block_cipher, hashed_block};
use crate::binary::errors::UnlockError;
use crate::binary::{CompressionType, KdbxHeader};
use crate::crypto::{self, MasterKey};
use log::debug;
use std::io::Read;

/// Run the full kdbx3 payload pipeline: decrypt, authenticate the key via
/// the stream start bytes, reassemble the hashed block stream and undo the
/// optional gzip compression. Returns the raw inner XML document.
pub(crate) fn kdbx3_decrypt(
    ciphertext: &[u8],
    key: &MasterKey,
    header: &KdbxHeader,
) -> Result<Vec<u8>, UnlockError> {
    let plaintext = block_cipher::decrypt_payload(ciphertext, key, &header.encryption_iv)?;
    if plaintext.len() < 32 {
        return Err(UnlockError::InvalidPassword);
    }
    if !crypto::constant_time_eq(&plaintext[..32], &header.stream_start_bytes) {
        return Err(UnlockError::InvalidPassword);
    }

    let packed = hashed_block::unpack_blocks(&plaintext[32..])?;
    let xml = match header.compression_type {
        CompressionType::None => packed,
        CompressionType::Gzip => gunzip(&packed)?,
        CompressionType::Unknown(_) => {
            return Err(UnlockError::CorruptPayload("unsupported compression type"))
        }
    };
    debug!("decrypted inner document of {} bytes", xml.len());
    Ok(xml)
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>, UnlockError> {
    let mut decoder = libflate::gzip::Decoder::new(data)
        .map_err(|_| UnlockError::CorruptPayload("payload is not valid gzip"))?;
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|_| UnlockError::CorruptPayload("payload is not valid gzip"))?;
    Ok(out)
}
