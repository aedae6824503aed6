use super::{errors, header};
use crate::export::{self, ExportFormat};
use crate::{crypto, stream, tree, xml};
use std::path::Path;

pub trait KdbxState: std::fmt::Debug {
    fn header(&self) -> &header::KdbxHeader;
    fn major_version(&self) -> u16;
    fn minor_version(&self) -> u16;
}

#[derive(Debug)]
/// A KeePass 2 archive wrapping a password database
///
/// Most methods are available on a specific state like `Kdbx<Locked>`
/// or `Kdbx<Unlocked>`.
///
/// An archive is obtained with [`kpdb::open`][crate::open] or
/// [`kpdb::from_reader`][crate::from_reader], both of which return
/// `Kdbx<Locked>`. Supplying credentials to [`Kdbx::unlock`] produces a
/// `Kdbx<Unlocked>` exposing the decrypted tree.
pub struct Kdbx<S>
where
    S: KdbxState,
{
    pub(super) state: S,
}

impl<T: KdbxState> Kdbx<T> {
    /// Encryption configuration from the unencrypted header
    pub fn header(&self) -> &header::KdbxHeader {
        self.state.header()
    }

    /// Major archive version
    pub fn major_version(&self) -> u16 {
        self.state.major_version()
    }

    /// Minor archive version
    pub fn minor_version(&self) -> u16 {
        self.state.minor_version()
    }
}

/// Represents a failed attempt at unlocking a database
///
/// Includes the locked database and the reason the unlock failed.
/// This lets interactive callers keep the database and prompt the user
/// for another passphrase when the error is credential related.
///
/// For unscripted use, `FailedUnlock` implements
/// `Into<`[`kpdb::Error`][crate::Error]`>` and
/// `Into<`[`UnlockError`][errors::UnlockError]`>`
/// for easy use with the `?` operator.
pub struct FailedUnlock(pub Kdbx<Locked>, pub errors::UnlockError);

impl From<FailedUnlock> for errors::UnlockError {
    fn from(funlock: FailedUnlock) -> errors::UnlockError {
        funlock.1
    }
}

#[derive(Debug, PartialEq, Eq)]
/// A locked kdbx file, use unlock(key) to access its entries
pub struct Locked {
    /// Header data of the kdbx archive, includes unencrypted metadata
    pub(crate) header: header::KdbxHeader,
    /// Raw bytes of header data as stored on disk
    pub(crate) header_data: Vec<u8>,
    /// Major version of the database file format
    pub(crate) major_version: u16,
    /// Minor version of the database file format
    pub(crate) minor_version: u16,
    /// Encrypted vault data
    pub(crate) encrypted_data: Vec<u8>,
}

impl KdbxState for Locked {
    fn header(&self) -> &header::KdbxHeader {
        &self.header
    }

    fn major_version(&self) -> u16 {
        self.major_version
    }

    fn minor_version(&self) -> u16 {
        self.minor_version
    }
}

impl Kdbx<Locked> {
    /// Raw bytes of the header as stored on disk
    pub fn header_data(&self) -> &[u8] {
        &self.state.header_data
    }

    fn decrypt(&self, key: &crypto::CompositeKey) -> Result<(Vec<u8>, tree::Database), errors::UnlockError> {
        let master_key = key.composed()?.master_key(
            &self.state.header.transform_seed,
            self.state.header.transform_rounds,
            &self.state.header.master_seed,
        );
        let xml_data =
            stream::kdbx3_decrypt(&self.state.encrypted_data, &master_key, &self.state.header)?;
        let mut protected = stream::ProtectedStream::new(&self.state.header.inner_stream_key);
        let database = xml::parse::parse_xml(&xml_data, &mut protected)?;
        Ok((xml_data, database))
    }

    /// Unlocks the kdbx file
    ///
    /// If unlock fails, returns the locked kdbx file along with the error
    pub fn unlock(self, key: &crypto::CompositeKey) -> Result<Kdbx<Unlocked>, FailedUnlock> {
        match self.decrypt(key) {
            Ok((xml_data, database)) => Ok(Kdbx {
                state: Unlocked {
                    header: self.state.header,
                    major_version: self.state.major_version,
                    minor_version: self.state.minor_version,
                    xml_data,
                    database,
                },
            }),
            Err(e) => Err(FailedUnlock(self, e)),
        }
    }
}

#[derive(Debug)]
/// An unlocked kdbx file, allowing access to stored credentials
pub struct Unlocked {
    /// Header data of the kdbx archive, includes unencrypted metadata
    pub(crate) header: header::KdbxHeader,
    /// Major version of the database file format
    pub(crate) major_version: u16,
    /// Minor version of the database file format
    pub(crate) minor_version: u16,
    /// Decrypted inner XML document, protected values still masked
    pub(crate) xml_data: Vec<u8>,
    /// Parsed password database
    pub(crate) database: tree::Database,
}

impl KdbxState for Unlocked {
    fn header(&self) -> &header::KdbxHeader {
        &self.header
    }

    fn major_version(&self) -> u16 {
        self.major_version
    }

    fn minor_version(&self) -> u16 {
        self.minor_version
    }
}

impl Kdbx<Unlocked> {
    /// Password database stored in this kdbx archive
    pub fn database(&self) -> &tree::Database {
        &self.state.database
    }

    /// The decrypted inner XML document.
    ///
    /// Protected values remain masked with the inner stream cipher, exactly
    /// as they came out of the block stream.
    pub fn raw_xml(&self) -> &[u8] {
        &self.state.xml_data
    }

    /// Write the inner XML document to `target`, plain or gzipped.
    ///
    /// The write is atomic: a temporary sibling is written, synced and
    /// renamed over the target.
    pub fn export<P: AsRef<Path>>(
        &self,
        target: P,
        format: ExportFormat,
    ) -> Result<(), errors::ExportError> {
        export::write_export(&self.state.xml_data, target.as_ref(), format)
    }
}
