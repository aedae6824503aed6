//! Credential handling and key derivation.
//!
//! A [`CompositeKey`] collects the user's passphrase and/or key file. During
//! unlock it is composed into a single 32-byte digest, stretched with the
//! header's AES-ECB transform and mixed with the master seed to produce the
//! payload decryption key. Every intermediate buffer is wiped when dropped.

use aes::Aes256;
use cipher::generic_array::GenericArray;
use cipher::{BlockEncrypt, KeyInit};
use log::debug;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use xml::reader::{EventReader, XmlEvent};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

#[derive(Debug, Error)]
/// Errors turning user credentials into key material
pub enum KeyError {
    /// Neither a passphrase nor a key file was supplied
    #[error("No credentials - supply a passphrase and/or a key file")]
    NoCredential,
    /// The key file could not be read
    #[error("Could not read key file - {0}")]
    KeyFile(#[from] io::Error),
}

/// Credentials needed to unlock a database
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CompositeKey {
    pw: Option<String>,
    keyfile: Option<[u8; 32]>,
}

impl CompositeKey {
    /// Create a key from a passphrase and/or a key file on disk
    pub fn new<P: AsRef<Path>>(
        pw: Option<&str>,
        key_file: Option<P>,
    ) -> Result<CompositeKey, KeyError> {
        let keyfile = match key_file {
            Some(path) => {
                let contents = Zeroizing::new(fs::read(path.as_ref())?);
                Some(key_file_material(&contents))
            }
            None => None,
        };
        Ok(CompositeKey {
            pw: pw.map(String::from),
            keyfile,
        })
    }

    /// Utility method for making a key with just a passphrase
    pub fn from_password(pw: &str) -> CompositeKey {
        CompositeKey {
            pw: Some(pw.into()),
            keyfile: None,
        }
    }

    /// Hash the supplied credentials into the 32-byte composite key
    pub(crate) fn composed(&self) -> Result<ComposedKey, KeyError> {
        if self.pw.is_none() && self.keyfile.is_none() {
            return Err(KeyError::NoCredential);
        }
        let mut buffer = Zeroizing::new(Vec::with_capacity(64));
        if let Some(ref pw) = self.pw {
            buffer.extend(Sha256::digest(pw.as_bytes()));
        }
        if let Some(ref keyfile) = self.keyfile {
            buffer.extend(keyfile.iter());
        }
        Ok(ComposedKey(Sha256::digest(buffer.as_slice()).into()))
    }
}

/// Composite key digest, input to the AES-ECB key transform
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct ComposedKey([u8; 32]);

impl ComposedKey {
    /// Stretch the composite key and mix in the master seed.
    ///
    /// Both 16-byte halves are independent across all rounds; they are
    /// handed to the cipher as one two-block batch per round.
    pub(crate) fn master_key(
        &self,
        transform_seed: &[u8; 32],
        transform_rounds: u64,
        master_seed: &[u8; 32],
    ) -> MasterKey {
        let cipher = Aes256::new(GenericArray::from_slice(transform_seed));
        let mut blocks = [
            GenericArray::clone_from_slice(&self.0[..16]),
            GenericArray::clone_from_slice(&self.0[16..]),
        ];
        for _ in 0..transform_rounds {
            cipher.encrypt_blocks(&mut blocks);
        }
        debug!("applied {} key transform rounds", transform_rounds);

        let mut stretched = Zeroizing::new([0u8; 32]);
        (*stretched)[..16].copy_from_slice(&blocks[0]);
        (*stretched)[16..].copy_from_slice(&blocks[1]);
        blocks[0].as_mut_slice().zeroize();
        blocks[1].as_mut_slice().zeroize();

        let transformed: Zeroizing<[u8; 32]> =
            Zeroizing::new(Sha256::digest(&*stretched).into());

        let mut hasher = Sha256::new();
        hasher.update(master_seed);
        hasher.update(&*transformed);
        MasterKey(hasher.finalize().into())
    }
}

/// Final 32-byte key for the payload cipher
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct MasterKey(pub(crate) [u8; 32]);

/// Derive the 32 bytes of key material contributed by a key file.
///
/// The recognized forms, first match wins: a raw 32-byte key, 64 hex
/// digits, a KeePass XML key file, and finally the SHA-256 of the whole
/// file for anything else.
fn key_file_material(data: &[u8]) -> [u8; 32] {
    if data.len() == 32 {
        let mut material = [0u8; 32];
        material.copy_from_slice(data);
        return material;
    }
    if data.len() == 64 && data.iter().all(|b| b.is_ascii_hexdigit()) {
        if let Ok(decoded) = hex::decode(data) {
            let mut material = [0u8; 32];
            material.copy_from_slice(&decoded);
            return material;
        }
    }
    if let Some(material) = xml_key_file_material(data) {
        return material;
    }
    Sha256::digest(data).into()
}

/// Extract key material from an XML key file's `KeyFile/Key/Data` element.
fn xml_key_file_material(data: &[u8]) -> Option<[u8; 32]> {
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    for event in EventReader::new(data) {
        match event.ok()? {
            XmlEvent::StartElement { name, .. } => path.push(name.local_name),
            XmlEvent::EndElement { .. } => {
                path.pop();
            }
            XmlEvent::Characters(chars) => {
                if path == ["KeyFile", "Key", "Data"] {
                    text = chars;
                }
            }
            _ => {}
        }
    }
    let decoded = base64::decode(text.trim()).ok()?;
    if decoded.len() != 32 {
        return None;
    }
    let mut material = [0u8; 32];
    material.copy_from_slice(&decoded);
    Some(material)
}

/// Confirm the hash of a block of data for corruption detection
pub(crate) fn verify_sha256(data: &[u8], expected_sha: &[u8]) -> bool {
    expected_sha == &*Sha256::digest(data)
}

/// Compare secrets without leaking the mismatch position through timing
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
