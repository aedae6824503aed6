use super::{errors, header, Kdbx, Locked};
use crate::utils;
use log::debug;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Position-tracked little-endian reader over a byte source.
pub(crate) struct ByteReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> ByteReader<R> {
    pub(crate) fn new(inner: R) -> ByteReader<R> {
        ByteReader { inner, position: 0 }
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        self.position += N as u64;
        Ok(buf)
    }

    pub(crate) fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub(crate) fn read_u16_le(&mut self) -> io::Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_u32_le(&mut self) -> io::Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_u64_le(&mut self) -> io::Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_exact(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = utils::buffer(len);
        self.inner.read_exact(&mut buf)?;
        self.position += len as u64;
        Ok(buf)
    }
}

impl<'a> ByteReader<&'a [u8]> {
    pub(crate) fn remaining(&self) -> usize {
        self.inner.len()
    }
}

/// Read a database from an input stream
///
/// The database starts locked, use [`Kdbx::unlock`] to access its entries.
///
/// [`Kdbx::unlock`]: ./struct.Kdbx.html#method.unlock
pub fn from_reader<R: Read>(mut input: R) -> Result<Kdbx<Locked>, errors::OpenError> {
    let mut caching_reader = utils::CachingReader::new(&mut input);
    let mut reader = ByteReader::new(&mut caching_reader);

    if reader.read_u32_le()? != super::KEEPASS_MAGIC_NUMBER {
        return Err(errors::OpenError::BadSignature);
    }
    if reader.read_u32_le()? != super::KDBX_MAGIC_NUMBER {
        return Err(errors::OpenError::BadSignature);
    }

    let minor_version = reader.read_u16_le()?;
    let major_version = reader.read_u16_le()?;
    if major_version != 3 {
        return Err(errors::OpenError::UnsupportedVersion(major_version));
    }
    debug!("kdbx archive version {}.{}", major_version, minor_version);

    let header = header::KdbxHeader::read(&mut reader)?;
    let header_end = reader.position();

    let (header_data, input) = caching_reader.into_inner();
    debug_assert_eq!(header_end, header_data.len() as u64);

    let mut encrypted_data = Vec::new();
    input.read_to_end(&mut encrypted_data)?;
    debug!(
        "read {} header bytes and {} ciphertext bytes",
        header_data.len(),
        encrypted_data.len()
    );

    Ok(Kdbx {
        state: Locked {
            header,
            header_data,
            major_version,
            minor_version,
            encrypted_data,
        },
    })
}

/// Read a database from a given path
///
/// The database starts locked, use [`Kdbx::unlock`] to access its entries.
///
/// [`Kdbx::unlock`]: ./struct.Kdbx.html#method.unlock
pub fn open<P: AsRef<Path>>(path: P) -> Result<Kdbx<Locked>, errors::OpenError> {
    let mut file = File::open(path.as_ref())?;
    from_reader(&mut file)
}
