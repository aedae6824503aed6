use std::fmt;
use uuid::Uuid;

pub const KEEPASS_MAGIC_NUMBER: u32 = 0x9AA2_D903;
pub const KDBX_MAGIC_NUMBER: u32 = 0xB54B_FB67;

const AES256_UUID: &str = "31c1f2e6-bf71-4350-be58-05216afc5aff";
const COMPRESSION_TYPE_NONE: u32 = 0;
const COMPRESSION_TYPE_GZIP: u32 = 1;

#[derive(PartialEq, Eq, Debug, Copy, Clone)]
/// Encryption cipher used for the main database payload
pub enum Cipher {
    /// AES 256 in CBC mode, the only cipher KDBX3.1 archives use
    Aes256,
    /// Cipher unknown to this library
    Unknown(Uuid),
}

impl Cipher {
    /// The UUID identifying this cipher in archive headers
    pub fn uuid(self) -> Uuid {
        match self {
            Cipher::Aes256 => Uuid::parse_str(AES256_UUID).unwrap(),
            Cipher::Unknown(uuid) => uuid,
        }
    }
}

impl From<Uuid> for Cipher {
    fn from(uuid: Uuid) -> Cipher {
        if uuid == Uuid::parse_str(AES256_UUID).unwrap() {
            Cipher::Aes256
        } else {
            Cipher::Unknown(uuid)
        }
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cipher::Aes256 => write!(f, "AES-256-CBC"),
            Cipher::Unknown(uuid) => write!(f, "unknown ({})", uuid),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// Compression applied to the payload prior to encryption
pub enum CompressionType {
    /// The encrypted data is uncompressed
    None,
    /// The encrypted data uses gzip compression
    Gzip,
    /// A compression method unsupported by this library
    Unknown(u32),
}

impl From<u32> for CompressionType {
    fn from(id: u32) -> CompressionType {
        match id {
            COMPRESSION_TYPE_NONE => CompressionType::None,
            COMPRESSION_TYPE_GZIP => CompressionType::Gzip,
            _ => CompressionType::Unknown(id),
        }
    }
}

impl From<CompressionType> for u32 {
    fn from(compression_type: CompressionType) -> u32 {
        match compression_type {
            CompressionType::None => COMPRESSION_TYPE_NONE,
            CompressionType::Gzip => COMPRESSION_TYPE_GZIP,
            CompressionType::Unknown(val) => val,
        }
    }
}

/// Stream cipher identifier for in-memory protected values
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InnerStreamId {
    /// ArcFour variant, legacy databases only
    ArcFour,
    /// Salsa20 stream cipher, the KDBX3.1 standard
    Salsa20,
    /// ChaCha20 stream cipher, KDBX4 only
    ChaCha20,
    /// Unknown stream cipher
    Unknown(u32),
}

impl From<u32> for InnerStreamId {
    fn from(id: u32) -> InnerStreamId {
        match id {
            1 => InnerStreamId::ArcFour,
            2 => InnerStreamId::Salsa20,
            3 => InnerStreamId::ChaCha20,
            x => InnerStreamId::Unknown(x),
        }
    }
}

impl From<InnerStreamId> for u32 {
    fn from(id: InnerStreamId) -> u32 {
        match id {
            InnerStreamId::ArcFour => 1,
            InnerStreamId::Salsa20 => 2,
            InnerStreamId::ChaCha20 => 3,
            InnerStreamId::Unknown(x) => x,
        }
    }
}
