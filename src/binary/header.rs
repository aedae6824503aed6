use super::errors::HeaderError as Error;
use super::header_fields::{Cipher, CompressionType, InnerStreamId};
use super::read::ByteReader;
use log::{debug, warn};
use std::convert::TryInto;
use std::io::Read;
use uuid::Uuid;
use zeroize::Zeroize;

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
/// Field types for the unencrypted kdbx3 header
pub enum OuterHeaderId {
    /// Last header field
    EndOfHeader,
    /// Custom comment to describe the database
    Comment,
    /// UUID indicating the cipher for the database
    CipherId,
    /// Compression algorithm in use
    CompressionFlags,
    /// Seed to make database keys unique
    MasterSeed,
    /// Seed used for stretching the composite key
    TransformSeed,
    /// Number of rounds of AES-256-ECB used to stretch the composite key
    TransformRounds,
    /// Initial value for decrypting the payload
    EncryptionIv,
    /// Key used for decrypting protected values
    InnerStreamKey,
    /// First 32 bytes of the decrypted payload, authenticates the key
    StreamStartBytes,
    /// Cipher identifier for protected values
    InnerStreamId,
    /// Some header field not supported by this library
    Unknown(u8),
}

impl From<u8> for OuterHeaderId {
    fn from(id: u8) -> OuterHeaderId {
        match id {
            0x0 => OuterHeaderId::EndOfHeader,
            0x1 => OuterHeaderId::Comment,
            0x2 => OuterHeaderId::CipherId,
            0x3 => OuterHeaderId::CompressionFlags,
            0x4 => OuterHeaderId::MasterSeed,
            0x5 => OuterHeaderId::TransformSeed,
            0x6 => OuterHeaderId::TransformRounds,
            0x7 => OuterHeaderId::EncryptionIv,
            0x8 => OuterHeaderId::InnerStreamKey,
            0x9 => OuterHeaderId::StreamStartBytes,
            0xA => OuterHeaderId::InnerStreamId,
            x => OuterHeaderId::Unknown(x),
        }
    }
}

impl From<OuterHeaderId> for u8 {
    fn from(id: OuterHeaderId) -> u8 {
        match id {
            OuterHeaderId::EndOfHeader => 0x0,
            OuterHeaderId::Comment => 0x1,
            OuterHeaderId::CipherId => 0x2,
            OuterHeaderId::CompressionFlags => 0x3,
            OuterHeaderId::MasterSeed => 0x4,
            OuterHeaderId::TransformSeed => 0x5,
            OuterHeaderId::TransformRounds => 0x6,
            OuterHeaderId::EncryptionIv => 0x7,
            OuterHeaderId::InnerStreamKey => 0x8,
            OuterHeaderId::StreamStartBytes => 0x9,
            OuterHeaderId::InnerStreamId => 0xA,
            OuterHeaderId::Unknown(x) => x,
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, ty: OuterHeaderId) -> Result<()> {
    if slot.is_some() {
        return Err(Error::DuplicateField(ty));
    }
    *slot = Some(value);
    Ok(())
}

fn fixed_size<const N: usize>(ty: OuterHeaderId, data: Vec<u8>) -> Result<[u8; N]> {
    let len = data.len();
    data.try_into()
        .map_err(|_| Error::MalformedField(ty, format!("expected {} bytes, got {}", N, len)))
}

#[derive(Default)]
struct KdbxHeaderBuilder {
    cipher: Option<Cipher>,
    compression_type: Option<CompressionType>,
    master_seed: Option<[u8; 32]>,
    transform_seed: Option<[u8; 32]>,
    transform_rounds: Option<u64>,
    encryption_iv: Option<[u8; 16]>,
    inner_stream_key: Option<[u8; 32]>,
    stream_start_bytes: Option<[u8; 32]>,
    inner_stream_id: Option<u32>,
}

impl KdbxHeaderBuilder {
    fn add_field(&mut self, ty: OuterHeaderId, data: Vec<u8>) -> Result<()> {
        match ty {
            OuterHeaderId::CipherId => {
                let uuid = Uuid::from_slice(&data).map_err(|_| {
                    Error::MalformedField(ty, "cipher UUID not valid".into())
                })?;
                set_once(&mut self.cipher, Cipher::from(uuid), ty)?;
            }
            OuterHeaderId::CompressionFlags => {
                let raw = u32::from_le_bytes(fixed_size(ty, data)?);
                let compression = CompressionType::from(raw);
                if let CompressionType::Unknown(id) = compression {
                    return Err(Error::MalformedField(
                        ty,
                        format!("unsupported compression flags {}", id),
                    ));
                }
                set_once(&mut self.compression_type, compression, ty)?;
            }
            OuterHeaderId::MasterSeed => {
                set_once(&mut self.master_seed, fixed_size(ty, data)?, ty)?
            }
            OuterHeaderId::TransformSeed => {
                set_once(&mut self.transform_seed, fixed_size(ty, data)?, ty)?
            }
            OuterHeaderId::TransformRounds => set_once(
                &mut self.transform_rounds,
                u64::from_le_bytes(fixed_size(ty, data)?),
                ty,
            )?,
            OuterHeaderId::EncryptionIv => {
                set_once(&mut self.encryption_iv, fixed_size(ty, data)?, ty)?
            }
            OuterHeaderId::InnerStreamKey => {
                set_once(&mut self.inner_stream_key, fixed_size(ty, data)?, ty)?
            }
            OuterHeaderId::StreamStartBytes => {
                set_once(&mut self.stream_start_bytes, fixed_size(ty, data)?, ty)?
            }
            OuterHeaderId::InnerStreamId => set_once(
                &mut self.inner_stream_id,
                u32::from_le_bytes(fixed_size(ty, data)?),
                ty,
            )?,
            OuterHeaderId::Comment => {}
            OuterHeaderId::Unknown(id) => {
                warn!("ignoring unknown header field {} ({} bytes)", id, data.len());
            }
            OuterHeaderId::EndOfHeader => {}
        }
        Ok(())
    }

    fn require<T>(slot: Option<T>, ty: OuterHeaderId) -> Result<T> {
        slot.ok_or(Error::MissingRequiredField(ty))
    }

    fn build(self) -> Result<KdbxHeader> {
        let cipher = Self::require(self.cipher, OuterHeaderId::CipherId)?;
        if let Cipher::Unknown(uuid) = cipher {
            return Err(Error::UnsupportedCipher(uuid));
        }
        let inner_stream_id =
            InnerStreamId::from(Self::require(self.inner_stream_id, OuterHeaderId::InnerStreamId)?);
        if inner_stream_id != InnerStreamId::Salsa20 {
            return Err(Error::UnsupportedInnerStream(inner_stream_id.into()));
        }
        Ok(KdbxHeader {
            cipher,
            compression_type: Self::require(
                self.compression_type,
                OuterHeaderId::CompressionFlags,
            )?,
            master_seed: Self::require(self.master_seed, OuterHeaderId::MasterSeed)?,
            transform_seed: Self::require(self.transform_seed, OuterHeaderId::TransformSeed)?,
            transform_rounds: Self::require(self.transform_rounds, OuterHeaderId::TransformRounds)?,
            encryption_iv: Self::require(self.encryption_iv, OuterHeaderId::EncryptionIv)?,
            inner_stream_key: Self::require(self.inner_stream_key, OuterHeaderId::InnerStreamKey)?,
            stream_start_bytes: Self::require(
                self.stream_start_bytes,
                OuterHeaderId::StreamStartBytes,
            )?,
            inner_stream_id,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
/// Unencrypted database configuration
///
/// Everything the decrypt path needs: the cipher and compression settings,
/// the key derivation parameters and the protected value stream key.
pub struct KdbxHeader {
    /// Encryption cipher used for the database payload
    pub cipher: Cipher,
    /// Compression applied prior to encryption
    pub compression_type: CompressionType,
    /// Master seed mixed into the final payload key
    pub master_seed: [u8; 32],
    /// AES-ECB key used to stretch the composite key
    pub transform_seed: [u8; 32],
    /// Rounds of AES-ECB applied to the composite key
    pub transform_rounds: u64,
    /// IV for the payload cipher
    pub encryption_iv: [u8; 16],
    /// Seed for the protected value stream cipher
    pub inner_stream_key: [u8; 32],
    /// Expected first 32 bytes of the decrypted payload
    pub stream_start_bytes: [u8; 32],
    /// Cipher identifier for protected values
    pub inner_stream_id: InnerStreamId,
}

impl Drop for KdbxHeader {
    fn drop(&mut self) {
        self.master_seed.zeroize();
        self.transform_seed.zeroize();
        self.inner_stream_key.zeroize();
        self.stream_start_bytes.zeroize();
    }
}

impl KdbxHeader {
    /// Read TLV header fields from the stream until the end-of-header marker.
    pub(crate) fn read<R: Read>(reader: &mut ByteReader<R>) -> Result<KdbxHeader> {
        let mut builder = KdbxHeaderBuilder::default();
        loop {
            let ty = OuterHeaderId::from(reader.read_u8()?);
            let len = reader.read_u16_le()? as usize;
            let data = reader.read_exact(len)?;
            if ty == OuterHeaderId::EndOfHeader {
                break;
            }
            builder.add_field(ty, data)?;
        }
        let header = builder.build()?;
        debug!(
            "parsed header: cipher={}, compression={:?}, {} transform rounds",
            header.cipher, header.compression_type, header.transform_rounds
        );
        Ok(header)
    }
}
