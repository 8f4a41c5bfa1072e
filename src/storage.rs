//! On-disk persistence for a built [`IdentityIndex`].
//!
//! Files start with [`LZ4_MAGIC`] followed by an LZ4 frame of bincode data.
//! Files without the magic are rejected.

use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RelinkError;
use crate::resolver::IdentityIndex;

pub const LZ4_MAGIC: &[u8; 4] = b"RLZ4";

/// Bumped whenever [`SavedIndex`] changes shape.
pub const FORMAT_VERSION: u32 = 1;

/// A saved index plus where it came from.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SavedIndex {
    pub format_version: u32,
    /// Seconds since the Unix epoch.
    pub built_at: u64,
    pub old_log: String,
    pub new_log: String,
    pub index: IdentityIndex,
}

impl SavedIndex {
    pub fn new(index: IdentityIndex, old_log: &Path, new_log: &Path) -> Self {
        let built_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            format_version: FORMAT_VERSION,
            built_at,
            old_log: old_log.display().to_string(),
            new_log: new_log.display().to_string(),
            index,
        }
    }
}

pub fn save_index(path: &Path, saved: &SavedIndex) -> Result<(), RelinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    save_compressed(path, saved, "identity-index")
}

/// Load a saved index, rejecting files written by an incompatible version.
pub fn load_index(path: &Path) -> Result<SavedIndex, RelinkError> {
    let saved: SavedIndex = load_compressed(path, "identity-index")?;
    if saved.format_version != FORMAT_VERSION {
        return Err(RelinkError::IndexLoad {
            path: path.display().to_string(),
            message: format!(
                "format version {} is not supported (expected {})",
                saved.format_version, FORMAT_VERSION
            ),
        });
    }
    Ok(saved)
}

/// Save a serializable value with LZ4 frame compression.
pub fn save_compressed<T: Serialize>(path: &Path, data: &T, label: &str) -> Result<(), RelinkError> {
    let start = Instant::now();

    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(LZ4_MAGIC)?;
    let mut encoder = lz4_flex::frame::FrameEncoder::new(writer);
    bincode::serialize_into(&mut encoder, data)?;
    let mut writer = encoder.finish().map_err(std::io::Error::other)?;
    writer.flush()?;

    let size = std::fs::metadata(path)?.len();
    info!(
        label,
        bytes = size,
        elapsed_ms = start.elapsed().as_millis() as u64,
        path = %path.display(),
        "Saved"
    );
    Ok(())
}

/// Load a value written by [`save_compressed`].
pub fn load_compressed<T: serde::de::DeserializeOwned>(path: &Path, label: &str) -> Result<T, RelinkError> {
    let path_str = path.display().to_string();
    let load_err = |message: String| RelinkError::IndexLoad {
        path: path_str.clone(),
        message,
    };
    let start = Instant::now();

    let file = std::fs::File::open(path).map_err(|e| load_err(format!("cannot open file: {}", e)))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|e| load_err(format!("read error (magic bytes): {}", e)))?;

    if &magic != LZ4_MAGIC {
        return Err(load_err(format!(
            "not a relink index (bad magic bytes {:02x?})",
            magic
        )));
    }
    let decoder = lz4_flex::frame::FrameDecoder::new(reader);
    let result: T =
        bincode::deserialize_from(decoder).map_err(|e| load_err(format!("LZ4 deserialization failed: {}", e)))?;

    info!(
        label,
        bytes = size,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Loaded"
    );
    Ok(result)
}
