//! Atomic export of the decrypted inner document.

use crate::binary::errors::ExportError;
use log::debug;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// On-disk format for an exported inner document
pub enum ExportFormat {
    /// The inner XML document byte for byte
    Xml,
    /// The inner XML document gzip compressed
    Gzip,
}

impl ExportFormat {
    /// Parse a format name as used on command lines, `xml` or `gzip`
    pub fn from_name(name: &str) -> Option<ExportFormat> {
        match name {
            "xml" => Some(ExportFormat::Xml),
            "gzip" => Some(ExportFormat::Gzip),
            _ => None,
        }
    }
}

/// Write `xml` to `target` in the requested format.
///
/// The data lands in a temporary file in the target's directory first and
/// is renamed into place after an fsync, so a crash can not leave a half
/// written export behind.
pub(crate) fn write_export(
    xml: &[u8],
    target: &Path,
    format: ExportFormat,
) -> Result<(), ExportError> {
    let dir = target.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match dir {
        Some(dir) => NamedTempFile::new_in(dir)?,
        None => NamedTempFile::new_in(".")?,
    };

    match format {
        ExportFormat::Xml => tmp.write_all(xml)?,
        ExportFormat::Gzip => {
            let mut encoder = libflate::gzip::Encoder::new(&mut tmp)?;
            encoder.write_all(xml)?;
            encoder.finish().into_result()?;
        }
    }
    tmp.as_file().sync_all()?;
    tmp.persist(target)?;
    debug!("exported {} bytes to {}", xml.len(), target.display());
    Ok(())
}
