use super::header::OuterHeaderId;
use crate::crypto::KeyError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
/// Errors encountered loading a database prior to decryption
pub enum OpenError {
    /// The first 8 bytes are not the KDBX signature
    #[error("Unsupported file type - not a kdbx database")]
    BadSignature,
    /// The file is KDBX but not major version 3
    #[error("Unsupported kdbx version {0}")]
    UnsupportedVersion(u16),
    /// The file ended before the header was completely read
    #[error("Input ended before the database header was complete")]
    TruncatedInput,
    /// There was some error parsing the unencrypted database header
    #[error("Error reading database header - {0}")]
    InvalidHeader(#[from] HeaderError),
    /// Error encountered reading the file
    #[error("IO error reading file - {0}")]
    Io(io::Error),
}

impl From<io::Error> for OpenError {
    fn from(e: io::Error) -> OpenError {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            OpenError::TruncatedInput
        } else {
            OpenError::Io(e)
        }
    }
}

#[derive(Debug, Error)]
/// Errors validating the database header
pub enum HeaderError {
    /// The input ended in the middle of a header field
    #[error("Input ended before the database header was complete")]
    TruncatedInput,
    /// A supported field had an unexpected format
    #[error("Malformed field of type {0:?} - {1}")]
    MalformedField(OuterHeaderId, String),
    /// A required field appeared more than once
    #[error("Duplicate header field of type {0:?}")]
    DuplicateField(OuterHeaderId),
    /// A required field is missing at the end of the header
    #[error("Missing required field of type {0:?}")]
    MissingRequiredField(OuterHeaderId),
    /// The database cipher is not AES-256
    #[error("Unsupported cipher {0}")]
    UnsupportedCipher(uuid::Uuid),
    /// The protected value stream cipher is not Salsa20
    #[error("Unsupported inner stream cipher id {0}")]
    UnsupportedInnerStream(u32),
    /// The reader failed before the header was entirely read
    #[error("Error reading database header - {0}")]
    Io(io::Error),
}

impl From<io::Error> for HeaderError {
    fn from(e: io::Error) -> HeaderError {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            HeaderError::TruncatedInput
        } else {
            HeaderError::Io(e)
        }
    }
}

#[derive(Debug, Error)]
/// Errors encountered unlocking an encrypted database
pub enum UnlockError {
    /// The supplied credentials could not be turned into a key
    #[error("Key error - {0}")]
    Key(#[from] KeyError),
    /// Decryption produced garbage, almost always wrong credentials
    #[error("Decryption failed - wrong password or key file")]
    InvalidPassword,
    /// The payload decrypted but its block structure is damaged
    #[error("Corrupt database payload - {0}")]
    CorruptPayload(&'static str),
    /// The decrypted XML document could not be parsed
    #[error("Corrupt database - XML data is invalid - {0}")]
    InvalidXml(#[from] crate::xml::parse::Error),
}

#[derive(Debug, Error)]
/// Errors encountered exporting the inner document
pub enum ExportError {
    /// The export file could not be written
    #[error("IO error writing export - {0}")]
    Io(#[from] io::Error),
    /// The temporary file could not be moved over the target
    #[error("Could not persist export - {0}")]
    Persist(#[from] tempfile::PersistError),
}
