//! Persistent calibration store.
//!
//! The store is one file holding the union of every session's
//! [`CalibrationTree`]. It is read whole, merged in memory and written back
//! whole; it is never appended to.
//!
//! # File Format
//!
//! 1. **Magic bytes**: `CALT` (4 bytes)
//! 2. **Version**: `u32` little-endian (4 bytes), currently 1
//! 3. **Flags**: `u32` little-endian (4 bytes), reserved
//! 4. **Payload**: bincode-encoded [`CalibrationTree`]
//!
//! Writes go to a temporary file in the target directory that is then
//! renamed over the store, so a crash mid-write leaves the previous store
//! intact.

use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bincode::Options;
use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use crate::error::{Result, StoreError};
use crate::tree::{CalibrationTree, MergeReport};

/// Magic bytes identifying a calibration store file.
pub const STORE_MAGIC: [u8; 4] = *b"CALT";

/// Current store format version.
pub const STORE_VERSION: u32 = 1;

/// Header size in bytes (magic + version + flags).
pub const STORE_HEADER_SIZE: usize = 12;

/// Store file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHeader {
    /// Magic bytes (must be `CALT`).
    pub magic: [u8; 4],
    /// Format version.
    pub version: u32,
    /// Flags (reserved).
    pub flags: u32,
}

impl StoreHeader {
    /// Header written by this version of the crate.
    #[must_use]
    pub const fn current() -> Self {
        Self {
            magic: STORE_MAGIC,
            version: STORE_VERSION,
            flags: 0,
        }
    }

    /// Header as it appears at the start of a store file.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; STORE_HEADER_SIZE] {
        let mut bytes = [0u8; STORE_HEADER_SIZE];
        bytes[..4].copy_from_slice(&self.magic);
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..].copy_from_slice(&self.flags.to_le_bytes());
        bytes
    }

    /// Splits `bytes` into a header this crate can read and the payload
    /// that follows it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if `bytes` is shorter than a
    /// header, and [`StoreError::InvalidMagic`] or
    /// [`StoreError::UnsupportedVersion`] for a foreign header.
    pub fn split(bytes: &[u8]) -> Result<(Self, &[u8])> {
        if bytes.len() < STORE_HEADER_SIZE {
            return Err(StoreError::serialization(format!(
                "truncated header: {} of {STORE_HEADER_SIZE} bytes",
                bytes.len()
            )));
        }
        let (head, payload) = bytes.split_at(STORE_HEADER_SIZE);
        let word = |at: usize| u32::from_le_bytes([head[at], head[at + 1], head[at + 2], head[at + 3]]);
        let header = Self {
            magic: [head[0], head[1], head[2], head[3]],
            version: word(4),
            flags: word(8),
        };

        if header.magic != STORE_MAGIC {
            return Err(StoreError::InvalidMagic(header.magic));
        }
        if header.version != STORE_VERSION {
            return Err(StoreError::UnsupportedVersion(header.version));
        }
        Ok((header, payload))
    }
}

/// Payload codec: fixed-width little-endian integers.
fn payload_codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

/// Encodes a tree (header + payload) to a writer.
///
/// # Errors
///
/// Returns an error if writing or serialization fails.
pub fn write_tree<W: Write>(tree: &CalibrationTree, writer: &mut W) -> Result<()> {
    writer.write_all(&StoreHeader::current().to_bytes())?;
    payload_codec().serialize_into(writer, tree)?;
    Ok(())
}

/// Decodes a tree (header + payload) from a reader.
///
/// The reader is drained into memory first; see [`tree_from_bytes`].
///
/// # Errors
///
/// Returns an IO error if reading fails, otherwise as [`tree_from_bytes`].
pub fn read_tree<R: Read>(reader: &mut R) -> Result<CalibrationTree> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    tree_from_bytes(&bytes)
}

/// Encodes a tree to bytes.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn tree_to_bytes(tree: &CalibrationTree) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_tree(tree, &mut buffer)?;
    Ok(buffer)
}

/// Decodes a tree from bytes.
///
/// # Errors
///
/// Returns [`StoreError::InvalidMagic`] or [`StoreError::UnsupportedVersion`]
/// for a foreign header, and [`StoreError::Serialization`] if the header is
/// truncated or the payload does not decode.
pub fn tree_from_bytes(bytes: &[u8]) -> Result<CalibrationTree> {
    let (_, payload) = StoreHeader::split(bytes)?;
    // A length prefix can never claim more than the bytes that follow it.
    let limit = u64::try_from(payload.len()).unwrap_or(u64::MAX);
    Ok(payload_codec().with_limit(limit).deserialize(payload)?)
}

/// The on-disk aggregate of all calibration sessions.
///
/// # Example
///
/// ```no_run
/// use calib_dataset::{CalibrationStore, CalibrationTree};
///
/// let store = CalibrationStore::new("data/real_calibration_data.calt");
/// let session = CalibrationTree::new();
///
/// // Nothing is written for a session without records.
/// let report = store.merge_and_save(session).unwrap();
/// assert!(report.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationStore {
    path: PathBuf,
}

impl CalibrationStore {
    /// Creates a store handle for `path`. Nothing is touched on disk.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the store file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads the stored tree. A missing file is an empty tree.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file exists but cannot be opened, and a
    /// corruption error ([`StoreError::is_corruption`]) if it cannot be decoded.
    pub fn load(&self) -> Result<CalibrationTree> {
        if !self.exists() {
            return Ok(CalibrationTree::new());
        }
        let bytes = fs::read(&self.path)?;
        tree_from_bytes(&bytes).map_err(|err| match err {
            StoreError::Serialization(reason) => StoreError::corrupt(&self.path, reason),
            other => other,
        })
    }

    /// Loads the stored tree, treating any failure as "no prior data".
    ///
    /// Failures are logged.
    #[must_use]
    pub fn load_or_empty(&self) -> CalibrationTree {
        match self.load() {
            Ok(tree) => tree,
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "failed to read calibration store, starting empty");
                CalibrationTree::new()
            }
        }
    }

    /// Writes `tree` as the whole store contents, atomically.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written or renamed.
    pub fn save(&self, tree: &CalibrationTree) -> Result<()> {
        let dir = self.parent_dir();
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            write_tree(tree, &mut writer)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::io(e.error.to_string()))?;

        info!(path = %self.path.display(), records = tree.record_count(), "calibration store written");
        Ok(())
    }

    /// Merges a session's tree into the store and writes the result back.
    ///
    /// Returns `Ok(None)` without touching the disk when `new_tree` holds no
    /// records. A corrupt existing store is treated as empty; its bytes are
    /// first copied next to the store with a `.corrupt` extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be opened, or if the
    /// merged tree cannot be written.
    pub fn merge_and_save(&self, new_tree: CalibrationTree) -> Result<Option<MergeReport>> {
        if new_tree.is_empty() {
            warn!(path = %self.path.display(), "no calibration records to save");
            return Ok(None);
        }

        let mut stored = match self.load() {
            Ok(tree) => tree,
            Err(err) if err.is_corruption() => {
                error!(path = %self.path.display(), error = %err, "calibration store is corrupt, treating as empty");
                self.preserve_corrupt()?;
                CalibrationTree::new()
            }
            Err(err) => return Err(err),
        };

        let report = stored.merge(new_tree);
        self.save(&stored)?;

        info!(
            path = %self.path.display(),
            inserted = report.inserted,
            overwritten = report.overwritten.len(),
            "merged session into calibration store"
        );
        Ok(Some(report))
    }

    /// Path a corrupt store is copied to before being overwritten.
    #[must_use]
    pub fn corrupt_backup_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
        name.push(".corrupt");
        self.path.with_file_name(name)
    }

    fn preserve_corrupt(&self) -> Result<()> {
        let backup = self.corrupt_backup_path();
        fs::copy(&self.path, &backup)?;
        warn!(backup = %backup.display(), "kept a copy of the corrupt store");
        Ok(())
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}
