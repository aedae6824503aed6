//! In-memory KDBX3.1 fixture builder.
//!
//! Implements the write side of the format with fixed seeds so the
//! integration suites can exercise the loader without binary fixture
//! files in the repository.

#![allow(dead_code)]

use aes::Aes256;
use cipher::block_padding::Pkcs7;
use cipher::generic_array::GenericArray;
use cipher::{BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit, StreamCipher};
use salsa20::Salsa20;
use sha2::{Digest, Sha256};
use std::io::Write;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;

pub const MASTER_SEED: [u8; 32] = [0x11; 32];
pub const TRANSFORM_SEED: [u8; 32] = [0x22; 32];
pub const TRANSFORM_ROUNDS: u64 = 64;
pub const ENCRYPTION_IV: [u8; 16] = [0x33; 16];
pub const INNER_STREAM_KEY: [u8; 32] = [0x44; 32];
pub const STREAM_START_BYTES: [u8; 32] = [0x55; 32];

pub const AES256_UUID_BYTES: [u8; 16] = [
    0x31, 0xc1, 0xf2, 0xe6, 0xbf, 0x71, 0x43, 0x50, 0xbe, 0x58, 0x05, 0x21, 0x6a, 0xfc, 0x5a,
    0xff,
];
pub const SALSA20_NONCE: [u8; 8] = [0xe8, 0x30, 0x09, 0x4b, 0x97, 0x20, 0x5d, 0x2a];

/// TLV-encode one header field.
pub fn tlv(id: u8, data: &[u8]) -> Vec<u8> {
    let mut out = vec![id];
    out.extend(&(data.len() as u16).to_le_bytes());
    out.extend(data);
    out
}

/// The full standard field set for a valid header.
pub fn standard_fields(compression: u32) -> Vec<(u8, Vec<u8>)> {
    vec![
        (0x2, AES256_UUID_BYTES.to_vec()),
        (0x3, compression.to_le_bytes().to_vec()),
        (0x4, MASTER_SEED.to_vec()),
        (0x5, TRANSFORM_SEED.to_vec()),
        (0x6, TRANSFORM_ROUNDS.to_le_bytes().to_vec()),
        (0x7, ENCRYPTION_IV.to_vec()),
        (0x8, INNER_STREAM_KEY.to_vec()),
        (0x9, STREAM_START_BYTES.to_vec()),
        (0xA, 2u32.to_le_bytes().to_vec()),
    ]
}

/// Serialize magic numbers, version 3.1 and the given fields.
pub fn header_with_fields(fields: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(&0x9AA2_D903u32.to_le_bytes());
    out.extend(&0xB54B_FB67u32.to_le_bytes());
    out.extend(&1u16.to_le_bytes());
    out.extend(&3u16.to_le_bytes());
    for (id, data) in fields {
        out.extend(tlv(*id, data));
    }
    out.extend(tlv(0x0, b"\r\n\r\n"));
    out
}

/// Composite key exactly as the loader derives it.
pub fn composite(pw: Option<&str>, keyfile: Option<&[u8; 32]>) -> [u8; 32] {
    let mut buffer = Vec::new();
    if let Some(pw) = pw {
        buffer.extend(Sha256::digest(pw.as_bytes()));
    }
    if let Some(keyfile) = keyfile {
        buffer.extend(keyfile);
    }
    Sha256::digest(&buffer).into()
}

/// Stretch a composite key into the final payload key.
pub fn master_key(composite: &[u8; 32]) -> [u8; 32] {
    let cipher = Aes256::new(GenericArray::from_slice(&TRANSFORM_SEED));
    let mut blocks = [
        GenericArray::clone_from_slice(&composite[..16]),
        GenericArray::clone_from_slice(&composite[16..]),
    ];
    for _ in 0..TRANSFORM_ROUNDS {
        cipher.encrypt_blocks(&mut blocks);
    }
    let mut stretched = [0u8; 32];
    stretched[..16].copy_from_slice(&blocks[0]);
    stretched[16..].copy_from_slice(&blocks[1]);
    let transformed = Sha256::digest(stretched);

    let mut hasher = Sha256::new();
    hasher.update(MASTER_SEED);
    hasher.update(transformed);
    hasher.finalize().into()
}

/// Mask plaintexts with the inner stream cipher, in the order they will
/// appear in the document. Returns base64 values ready for the XML.
pub fn protect_values(values: &[&str]) -> Vec<String> {
    let key = Sha256::digest(INNER_STREAM_KEY);
    let mut cipher = Salsa20::new(&key, &SALSA20_NONCE.into());
    values
        .iter()
        .map(|value| {
            let mut data = value.as_bytes().to_vec();
            cipher.apply_keystream(&mut data);
            base64::encode(data)
        })
        .collect()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = libflate::gzip::Encoder::new(Vec::new()).unwrap();
    encoder.write_all(data).unwrap();
    encoder.finish().into_result().unwrap()
}

/// Frame `body` as a hashed block stream, prefix the stream start bytes
/// and AES-256-CBC encrypt the lot under `key`.
pub fn encrypt_payload(body: &[u8], key: &[u8; 32]) -> Vec<u8> {
    let mut plaintext = STREAM_START_BYTES.to_vec();
    let mut block_count = 0u32;
    for (index, chunk) in body.chunks(64).enumerate() {
        plaintext.extend(&(index as u32).to_le_bytes());
        plaintext.extend(Sha256::digest(chunk));
        plaintext.extend(&(chunk.len() as u32).to_le_bytes());
        plaintext.extend(chunk);
        block_count += 1;
    }
    plaintext.extend(&block_count.to_le_bytes());
    plaintext.extend(&[0u8; 32]);
    plaintext.extend(&0u32.to_le_bytes());

    Aes256CbcEnc::new(key.into(), &ENCRYPTION_IV.into())
        .encrypt_padded_vec_mut::<Pkcs7>(&plaintext)
}

/// Assemble a complete kdbx3 file around `xml`.
pub fn build_kdbx3(
    xml: &[u8],
    pw: Option<&str>,
    keyfile: Option<&[u8; 32]>,
    compress: bool,
) -> Vec<u8> {
    let compression = if compress { 1 } else { 0 };
    let mut file = header_with_fields(&standard_fields(compression));
    let body = if compress { gzip(xml) } else { xml.to_vec() };
    let key = master_key(&composite(pw, keyfile));
    file.extend(encrypt_payload(&body, &key));
    file
}

/// Base64 of a 16-byte UUID filled with `n`, as KeePass XML stores them.
pub fn uuid_b64(n: u8) -> String {
    base64::encode([n; 16])
}

/// A small database: one group `General` holding one entry `Sample` with
/// username `user` and protected password `pw`.
pub fn sample_database_xml() -> Vec<u8> {
    let protected = protect_values(&["pw"]).remove(0);
    format!(
        r#"<KeePassFile>
  <Meta>
    <Generator>kpdb</Generator>
    <DatabaseName>fixture</DatabaseName>
  </Meta>
  <Root>
    <Group>
      <UUID>{root}</UUID>
      <Name>Root</Name>
      <Group>
        <UUID>{general}</UUID>
        <Name>General</Name>
        <Entry>
          <UUID>{entry}</UUID>
          <String><Key>Title</Key><Value>Sample</Value></String>
          <String><Key>UserName</Key><Value>user</Value></String>
          <String><Key>Password</Key><Value Protected="True">{pw}</Value></String>
        </Entry>
      </Group>
    </Group>
  </Root>
</KeePassFile>"#,
        root = uuid_b64(1),
        general = uuid_b64(2),
        entry = uuid_b64(3),
        pw = protected,
    )
    .into_bytes()
}
