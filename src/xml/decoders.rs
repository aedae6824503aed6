use chrono::{DateTime, NaiveDate, NaiveDateTime};
use uuid::Uuid;

/// The instant KeePass timestamps count from, year 1 day 1.
pub(crate) fn keepass_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Decode a UUID from a KeePass XML file
///
/// UUIDs in KeePass XML files are stored base64 encoded
pub(crate) fn decode_uuid(b64uuid: &str) -> Option<Uuid> {
    let decoded = base64::decode(b64uuid).ok()?;
    Uuid::from_slice(&decoded).ok()
}

/// Decode a datetime from a KeePass XML file
///
/// KDBX3 stores ISO 8601 date strings
pub(crate) fn decode_datetime(strdate: &str) -> Option<NaiveDateTime> {
    let dt = DateTime::parse_from_rfc3339(strdate).ok()?;
    Some(dt.naive_utc())
}

/// Decode a boolean element value from a KeePass XML file
pub(crate) fn decode_bool(value: &str) -> bool {
    value == "True"
}
