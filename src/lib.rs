#![deny(missing_docs)]

//! Read-only access to KDBX 3.1 (KeePass 2) database files.
//!
//! Databases are opened with the [`kpdb::open`] function, which parses the
//! unencrypted header and returns a locked archive. Supplying a
//! [`CompositeKey`] to [`Kdbx::unlock`] decrypts and verifies the payload
//! and exposes the tree of groups and entries.
//!
//! ```no_run
//! # fn main() -> Result<(), kpdb::Error> {
//! use kpdb::CompositeKey;
//!
//! let locked = kpdb::open("passwords.kdbx")?;
//! let key = CompositeKey::from_password("my passphrase");
//! let unlocked = locked.unlock(&key)?;
//! let db = unlocked.database();
//!
//! if let Some(group) = db.find_group("/General", "/") {
//!     for entry in group.entries() {
//!         println!("{}", entry.title().unwrap_or("(untitled)"));
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Alternatively, [`kpdb::from_reader`] opens a database from any
//! [`std::io::Read`] source, and [`kpdb::open_with_key`] collapses the
//! open and unlock steps for non-interactive callers.
//!
//! [`CompositeKey`]: ./struct.CompositeKey.html
//! [`Kdbx::unlock`]: ./binary/struct.Kdbx.html#method.unlock
//! [`kpdb::from_reader`]: ./fn.from_reader.html
//! [`kpdb::open`]: ./fn.open.html
//! [`kpdb::open_with_key`]: ./fn.open_with_key.html

pub mod binary;
mod crypto;
pub mod errors;
mod export;
mod stream;
pub mod tree;
mod utils;
pub(crate) mod xml;

pub use binary::{from_reader, open, Kdbx, Locked, Unlocked};
pub use crypto::CompositeKey;
pub use errors::Error;
pub use export::ExportFormat;
pub use tree::{absolute_path, Database, Entry, Group};

use std::path::Path;

/// Open and unlock a database in one step.
///
/// Interactive callers that want to re-prompt on a wrong passphrase should
/// use [`open`] and [`Kdbx::unlock`] instead, which hand the locked
/// archive back on failure.
///
/// [`Kdbx::unlock`]: ./binary/struct.Kdbx.html#method.unlock
pub fn open_with_key<P: AsRef<Path>>(
    path: P,
    key: &CompositeKey,
) -> Result<Kdbx<Unlocked>, Error> {
    let locked = open(path)?;
    Ok(locked.unlock(key)?)
}
