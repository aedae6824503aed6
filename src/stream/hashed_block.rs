use crate::binary::errors::UnlockError;
use crate::binary::read::ByteReader;
use crate::crypto;
use log::debug;

/// Reassemble the inner payload from the hashed block stream.
///
/// Each block is `{u32 index, [u8; 32] sha256, u32 size, data}`. The stream
/// ends with a zero-size block whose hash is all zeroes. Indices must count
/// up from 0 and every hash must match its data.
pub(crate) fn unpack_blocks(payload: &[u8]) -> Result<Vec<u8>, UnlockError> {
    let mut reader = ByteReader::new(payload);
    let mut data = Vec::with_capacity(payload.len());
    let mut expected_index = 0u32;
    loop {
        let index = read_block_field(reader.read_u32_le())?;
        let hash: [u8; 32] = read_block_field(reader.read_array())?;
        let size = read_block_field(reader.read_u32_le())? as usize;

        if size == 0 {
            if hash != [0u8; 32] {
                return Err(UnlockError::CorruptPayload(
                    "terminator block has a non-zero hash",
                ));
            }
            break;
        }

        if index != expected_index {
            return Err(UnlockError::CorruptPayload("block index out of order"));
        }
        let block = read_block_field(reader.read_exact(size))?;
        if !crypto::verify_sha256(&block, &hash) {
            return Err(UnlockError::CorruptPayload("block failed hash verification"));
        }
        data.extend_from_slice(&block);
        expected_index += 1;
    }
    debug!(
        "unpacked {} blocks into {} payload bytes",
        expected_index,
        data.len()
    );
    Ok(data)
}

fn read_block_field<T>(result: std::io::Result<T>) -> Result<T, UnlockError> {
    result.map_err(|_| UnlockError::CorruptPayload("block stream truncated"))
}
