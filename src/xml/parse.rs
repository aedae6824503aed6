use super::decoders::{decode_bool, decode_datetime, decode_uuid};
use crate::stream::ProtectedStream;
use crate::tree::{Database, Entry, Field, Group, Meta, Times, Value};
use std::io::Read;
use thiserror::Error;
use uuid::Uuid;
use xml::attribute::OwnedAttribute;
use xml::reader::{EventReader, ParserConfig, XmlEvent};

#[derive(Debug, Error)]
/// Error encountered parsing the inner XML document
pub enum Error {
    /// Error from the underlying XML parser
    #[error("Error parsing database XML: {0}")]
    Xml(String),
    /// The document has no `KeePassFile/Root/Group` tree
    #[error("Database XML has no root group")]
    MissingRoot,
    /// A protected value could not be decoded
    #[error("Protected value for key '{0}' is not valid")]
    BadProtectedValue(String),
}

type Result<T> = std::result::Result<T, Error>;

impl From<xml::reader::Error> for Error {
    fn from(e: xml::reader::Error) -> Error {
        Error::Xml(e.msg().to_string())
    }
}

fn is_protected(attributes: &[OwnedAttribute]) -> bool {
    attributes
        .iter()
        .any(|attr| attr.name.local_name == "Protected" && attr.value == "True")
}

fn unexpected_end() -> Error {
    Error::Xml("unexpected end of document".into())
}

/// Parse the decrypted inner XML into a database tree.
///
/// The protected value cursor is advanced at each `Protected="True"` value
/// in document order, including values inside subtrees this parser does not
/// otherwise model. Consuming them anywhere else would shift the keystream
/// for every later value.
pub(crate) fn parse_xml(data: &[u8], cipher: &mut ProtectedStream) -> Result<Database> {
    let config = ParserConfig::new()
        .trim_whitespace(true)
        .cdata_to_characters(true);
    let mut reader = EventReader::new_with_config(data, config);
    let mut meta = Meta::default();
    let mut root = None;

    loop {
        match reader.next()? {
            XmlEvent::StartElement { name, .. } => {
                if name.local_name == "KeePassFile" {
                    parse_keepass_file(&mut reader, cipher, &mut meta, &mut root)?;
                } else {
                    skip_element(&mut reader, cipher)?;
                }
            }
            XmlEvent::EndDocument => break,
            _ => {}
        }
    }

    let root = root.ok_or(Error::MissingRoot)?;
    Ok(Database::assemble(meta, root))
}

fn parse_keepass_file<R: Read>(
    reader: &mut EventReader<R>,
    cipher: &mut ProtectedStream,
    meta: &mut Meta,
    root: &mut Option<Group>,
) -> Result<()> {
    loop {
        match reader.next()? {
            XmlEvent::StartElement { name, .. } => match name.local_name.as_str() {
                "Meta" => parse_meta(reader, cipher, meta)?,
                "Root" => parse_root(reader, cipher, root)?,
                _ => skip_element(reader, cipher)?,
            },
            XmlEvent::EndElement { .. } => return Ok(()),
            XmlEvent::EndDocument => return Err(unexpected_end()),
            _ => {}
        }
    }
}

fn parse_meta<R: Read>(
    reader: &mut EventReader<R>,
    cipher: &mut ProtectedStream,
    meta: &mut Meta,
) -> Result<()> {
    loop {
        match reader.next()? {
            XmlEvent::StartElement { name, .. } => match name.local_name.as_str() {
                "Generator" => meta.generator = read_text(reader, cipher)?,
                "DatabaseName" => meta.database_name = read_text(reader, cipher)?,
                "DatabaseDescription" => meta.database_description = read_text(reader, cipher)?,
                _ => skip_element(reader, cipher)?,
            },
            XmlEvent::EndElement { .. } => return Ok(()),
            XmlEvent::EndDocument => return Err(unexpected_end()),
            _ => {}
        }
    }
}

fn parse_root<R: Read>(
    reader: &mut EventReader<R>,
    cipher: &mut ProtectedStream,
    root: &mut Option<Group>,
) -> Result<()> {
    loop {
        match reader.next()? {
            XmlEvent::StartElement { name, .. } => {
                if name.local_name == "Group" && root.is_none() {
                    *root = Some(parse_group(reader, cipher)?);
                } else {
                    skip_element(reader, cipher)?;
                }
            }
            XmlEvent::EndElement { .. } => return Ok(()),
            XmlEvent::EndDocument => return Err(unexpected_end()),
            _ => {}
        }
    }
}

fn parse_group<R: Read>(
    reader: &mut EventReader<R>,
    cipher: &mut ProtectedStream,
) -> Result<Group> {
    let mut group = Group::default();
    loop {
        match reader.next()? {
            XmlEvent::StartElement { name, .. } => match name.local_name.as_str() {
                "Group" => {
                    let child = parse_group(reader, cipher)?;
                    group.groups.push(child);
                }
                "Entry" => {
                    let entry = parse_entry(reader, cipher)?;
                    group.entries.push(entry);
                }
                "Name" => group.name = read_text(reader, cipher)?,
                "Notes" => group.notes = read_text(reader, cipher)?,
                "UUID" => {
                    group.uuid = decode_uuid(&read_text(reader, cipher)?).unwrap_or_else(Uuid::nil)
                }
                "IconID" => group.icon = read_text(reader, cipher)?.parse().ok(),
                "Times" => group.times = parse_times(reader, cipher)?,
                _ => skip_element(reader, cipher)?,
            },
            XmlEvent::EndElement { .. } => return Ok(group),
            XmlEvent::EndDocument => return Err(unexpected_end()),
            _ => {}
        }
    }
}

fn parse_entry<R: Read>(
    reader: &mut EventReader<R>,
    cipher: &mut ProtectedStream,
) -> Result<Entry> {
    let mut entry = Entry::default();
    loop {
        match reader.next()? {
            XmlEvent::StartElement { name, .. } => match name.local_name.as_str() {
                "UUID" => {
                    entry.uuid = decode_uuid(&read_text(reader, cipher)?).unwrap_or_else(Uuid::nil)
                }
                "IconID" => entry.icon = read_text(reader, cipher)?.parse().ok(),
                "Tags" => entry.tags = read_text(reader, cipher)?,
                "String" => {
                    let field = parse_field(reader, cipher)?;
                    entry.fields.push(field);
                }
                "Times" => entry.times = parse_times(reader, cipher)?,
                "History" => parse_history(reader, cipher, &mut entry)?,
                _ => skip_element(reader, cipher)?,
            },
            XmlEvent::EndElement { .. } => return Ok(entry),
            XmlEvent::EndDocument => return Err(unexpected_end()),
            _ => {}
        }
    }
}

fn parse_history<R: Read>(
    reader: &mut EventReader<R>,
    cipher: &mut ProtectedStream,
    entry: &mut Entry,
) -> Result<()> {
    loop {
        match reader.next()? {
            XmlEvent::StartElement { name, .. } => {
                if name.local_name == "Entry" {
                    let old = parse_entry(reader, cipher)?;
                    entry.history.push(old);
                } else {
                    skip_element(reader, cipher)?;
                }
            }
            XmlEvent::EndElement { .. } => return Ok(()),
            XmlEvent::EndDocument => return Err(unexpected_end()),
            _ => {}
        }
    }
}

fn parse_field<R: Read>(
    reader: &mut EventReader<R>,
    cipher: &mut ProtectedStream,
) -> Result<Field> {
    let mut field = Field::default();
    loop {
        match reader.next()? {
            XmlEvent::StartElement {
                name, attributes, ..
            } => match name.local_name.as_str() {
                "Key" => field.key = read_text(reader, cipher)?,
                "Value" => {
                    let protected = is_protected(&attributes);
                    let raw = read_text(reader, cipher)?;
                    field.value = if protected {
                        let plain = cipher
                            .decrypt_next(&raw)
                            .ok_or_else(|| Error::BadProtectedValue(field.key.clone()))?;
                        Value::Protected(plain)
                    } else if raw.is_empty() {
                        Value::Empty
                    } else {
                        Value::Standard(raw)
                    };
                }
                _ => skip_element(reader, cipher)?,
            },
            XmlEvent::EndElement { .. } => return Ok(field),
            XmlEvent::EndDocument => return Err(unexpected_end()),
            _ => {}
        }
    }
}

fn parse_times<R: Read>(
    reader: &mut EventReader<R>,
    cipher: &mut ProtectedStream,
) -> Result<Times> {
    let mut times = Times::default();
    loop {
        match reader.next()? {
            XmlEvent::StartElement { name, .. } => match name.local_name.as_str() {
                "CreationTime" => {
                    if let Some(dt) = decode_datetime(&read_text(reader, cipher)?) {
                        times.creation_time = dt;
                    }
                }
                "LastModificationTime" => {
                    if let Some(dt) = decode_datetime(&read_text(reader, cipher)?) {
                        times.last_modification_time = dt;
                    }
                }
                "LastAccessTime" => {
                    if let Some(dt) = decode_datetime(&read_text(reader, cipher)?) {
                        times.last_access_time = dt;
                    }
                }
                "ExpiryTime" => {
                    if let Some(dt) = decode_datetime(&read_text(reader, cipher)?) {
                        times.expiry_time = dt;
                    }
                }
                "Expires" => times.expires = decode_bool(&read_text(reader, cipher)?),
                "UsageCount" => {
                    times.usage_count = read_text(reader, cipher)?.parse().unwrap_or(0)
                }
                _ => skip_element(reader, cipher)?,
            },
            XmlEvent::EndElement { .. } => return Ok(times),
            XmlEvent::EndDocument => return Err(unexpected_end()),
            _ => {}
        }
    }
}

/// Collect the character content of the current element, consuming its end
/// tag. Unexpected child elements are skipped.
fn read_text<R: Read>(reader: &mut EventReader<R>, cipher: &mut ProtectedStream) -> Result<String> {
    let mut text = String::new();
    loop {
        match reader.next()? {
            XmlEvent::Characters(chars) => text.push_str(&chars),
            XmlEvent::StartElement { attributes, .. } => {
                consume_subtree(reader, cipher, &attributes)?;
            }
            XmlEvent::EndElement { .. } => return Ok(text),
            XmlEvent::EndDocument => return Err(unexpected_end()),
            _ => {}
        }
    }
}

/// Skip the current element and everything below it, still consuming
/// keystream for any protected values inside.
fn skip_element<R: Read>(reader: &mut EventReader<R>, cipher: &mut ProtectedStream) -> Result<()> {
    loop {
        match reader.next()? {
            XmlEvent::StartElement { attributes, .. } => {
                consume_subtree(reader, cipher, &attributes)?;
            }
            XmlEvent::EndElement { .. } => return Ok(()),
            XmlEvent::EndDocument => return Err(unexpected_end()),
            _ => {}
        }
    }
}

fn consume_subtree<R: Read>(
    reader: &mut EventReader<R>,
    cipher: &mut ProtectedStream,
    attributes: &[OwnedAttribute],
) -> Result<()> {
    if is_protected(attributes) {
        let raw = read_text(reader, cipher)?;
        let _ = cipher.decrypt_next(&raw);
        Ok(())
    } else {
        skip_element(reader, cipher)
    }
}
