mod fingerprint;

pub use fingerprint::CacheFingerprint;

use std::path::Path;

use crate::error::{FindexError, Result};
use crate::fs::FileSystem;
use crate::tree::{DirSnapshot, DirTree};

/// Magic bytes identifying a findex cache file
pub const CACHE_MAGIC: [u8; 4] = *b"FNDX";

/// Current cache format version - increment when format changes
pub const CACHE_VERSION: u32 = 1;

/// Encode a tree to the on-disk envelope.
///
/// File format:
/// [4B] Magic "FNDX"
/// [4B] Version (u32 LE)
/// [4B] Fingerprint length (u32 LE)
/// [NB] Fingerprint (postcard)
/// [4B] Body length (u32 LE)
/// [MB] Body (postcard, snapshots sorted by path)
/// [4B] CRC32 checksum of all preceding bytes
///
/// Snapshots are serialized in lexicographic path order with their name
/// lists pre-sorted, so identical logical content always produces
/// byte-identical output no matter how the scan was scheduled. Nothing
/// run-varying (timestamps, counters) is written.
pub fn encode(fingerprint: &CacheFingerprint, tree: &DirTree) -> Result<Vec<u8>> {
    let mut data = Vec::new();

    data.extend_from_slice(&CACHE_MAGIC);
    data.extend_from_slice(&CACHE_VERSION.to_le_bytes());

    let fingerprint_bytes = postcard::to_allocvec(fingerprint)
        .map_err(|e| FindexError::Cache(format!("Failed to serialize fingerprint: {}", e)))?;
    data.extend_from_slice(&(fingerprint_bytes.len() as u32).to_le_bytes());
    data.extend_from_slice(&fingerprint_bytes);

    let body_bytes = postcard::to_allocvec(&tree.sorted_snapshots())
        .map_err(|e| FindexError::Cache(format!("Failed to serialize tree: {}", e)))?;
    data.extend_from_slice(&(body_bytes.len() as u32).to_le_bytes());
    data.extend_from_slice(&body_bytes);

    let checksum = crc32fast::hash(&data);
    data.extend_from_slice(&checksum.to_le_bytes());

    Ok(data)
}

/// Decode an envelope. Every structural check (size, checksum, magic,
/// version, section lengths) runs before any deserialization, so a
/// corrupted file is rejected cheaply and never partially trusted.
pub fn decode(data: &[u8]) -> Result<(CacheFingerprint, DirTree)> {
    // Need at least: magic(4) + version(4) + fp_len(4) + body_len(4) + checksum(4)
    if data.len() < 20 {
        return Err(FindexError::Cache("Cache file too small".to_string()));
    }

    let checksum_offset = data.len() - 4;
    let stored_checksum = u32::from_le_bytes([
        data[checksum_offset],
        data[checksum_offset + 1],
        data[checksum_offset + 2],
        data[checksum_offset + 3],
    ]);
    let computed_checksum = crc32fast::hash(&data[..checksum_offset]);
    if stored_checksum != computed_checksum {
        return Err(FindexError::Cache("Cache checksum mismatch".to_string()));
    }

    let mut offset = 0;

    let magic: [u8; 4] = data[offset..offset + 4].try_into().unwrap();
    if magic != CACHE_MAGIC {
        return Err(FindexError::Cache("Invalid cache magic".to_string()));
    }
    offset += 4;

    let version = u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap());
    if version != CACHE_VERSION {
        return Err(FindexError::Cache(format!(
            "Cache version mismatch: expected {}, got {}",
            CACHE_VERSION, version
        )));
    }
    offset += 4;

    let fingerprint_len =
        u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap()) as usize;
    offset += 4;
    if offset + fingerprint_len + 4 > checksum_offset {
        return Err(FindexError::Cache("Invalid fingerprint length".to_string()));
    }
    let fingerprint: CacheFingerprint =
        postcard::from_bytes(&data[offset..offset + fingerprint_len]).map_err(|e| {
            FindexError::Cache(format!("Failed to deserialize fingerprint: {}", e))
        })?;
    offset += fingerprint_len;

    let body_len = u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap()) as usize;
    offset += 4;
    if offset + body_len != checksum_offset {
        return Err(FindexError::Cache("Invalid body length".to_string()));
    }
    let snapshots: Vec<DirSnapshot> = postcard::from_bytes(&data[offset..offset + body_len])
        .map_err(|e| FindexError::Cache(format!("Failed to deserialize tree: {}", e)))?;

    Ok((fingerprint, DirTree::from_snapshots(snapshots)))
}

/// Load a usable prior tree from `path`, along with the raw bytes it was
/// decoded from (kept so an unchanged index can skip the next write).
///
/// Any failure - missing file, truncation, corruption, version or
/// fingerprint mismatch - is an `Err` the caller treats as "cold scan",
/// never as fatal.
pub fn load(
    fs: &dyn FileSystem,
    path: &Path,
    current: &CacheFingerprint,
) -> Result<(DirTree, Vec<u8>)> {
    let data = fs
        .read_file(path)
        .map_err(|e| FindexError::Cache(format!("Failed to read cache file: {}", e.into_io())))?;
    let (fingerprint, tree) = decode(&data)?;
    if fingerprint != *current {
        return Err(FindexError::Cache("Cache fingerprint mismatch".to_string()));
    }
    Ok((tree, data))
}

/// Write encoded cache bytes through the adapter (atomic replace).
pub fn save(fs: &dyn FileSystem, path: &Path, data: &[u8]) -> Result<()> {
    fs.write_file(path, data)
        .map_err(|e| FindexError::Cache(format!("Failed to write cache file: {}", e.into_io())))
}
