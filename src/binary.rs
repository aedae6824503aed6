//! .kdbx archives and the outer binary format
//!
//! Most methods are available on a specific state like `Kdbx<Locked>`
//! or `Kdbx<Unlocked>`.
//!
//! An existing archive is read with [`kpdb::open`][crate::open] or
//! [`kpdb::from_reader`][crate::from_reader] and unlocked with
//! [`Kdbx::unlock`].

pub(crate) mod errors;
mod header;
mod header_fields;
mod kdbx;
pub(crate) mod read;

pub use header::{KdbxHeader, OuterHeaderId};
pub use header_fields::{Cipher, CompressionType, InnerStreamId};
pub(crate) use header_fields::{KDBX_MAGIC_NUMBER, KEEPASS_MAGIC_NUMBER};
pub use kdbx::{FailedUnlock, Kdbx, Locked, Unlocked};
pub use read::{from_reader, open};
