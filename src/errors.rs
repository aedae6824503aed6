//! Error types for kpdb

pub use crate::binary::errors::{ExportError, HeaderError, OpenError, UnlockError};
pub use crate::crypto::KeyError;
pub use crate::xml::parse::Error as XmlReadError;
use thiserror::Error;

#[derive(Error, Debug)]
/// Wrapper error type for this library
pub enum Error {
    /// Failed to open a database
    #[error("Could not open database: {0}")]
    Open(#[from] OpenError),
    /// Failed unlocking a database
    #[error("Could not unlock database: {0}")]
    Unlock(#[from] UnlockError),
    /// Failed turning credentials into a key
    #[error("Could not build encryption key: {0}")]
    Key(#[from] KeyError),
    /// Failed exporting the inner document
    #[error("Could not export database: {0}")]
    Export(#[from] ExportError),
}

impl From<crate::binary::FailedUnlock> for Error {
    fn from(funlock: crate::binary::FailedUnlock) -> Error {
        Error::Unlock(funlock.1)
    }
}
