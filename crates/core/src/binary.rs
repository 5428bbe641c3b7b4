//! Binary blob loading.
//!
//! Compiled shader bytecode is persisted as opaque binary files at fixed
//! relative paths. This module is the single place the renderer touches the
//! filesystem for those blobs.

use std::path::Path;

use tracing::debug;

/// Load the full contents of a binary file.
///
/// Returns `None` if the file cannot be opened or read. The contents are
/// treated as opaque bytes; no header or version validation is performed
/// here.
pub fn load_binary(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => {
            debug!("Loaded {} bytes from {:?}", bytes.len(), path);
            Some(bytes)
        }
        Err(e) => {
            debug!("Failed to read {:?}: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_binary_missing_file() {
        let path = Path::new("definitely/not/a/real/file.spv");
        assert!(load_binary(path).is_none());
    }

    #[test]
    fn test_load_binary_round_trip() {
        let mut path = std::env::temp_dir();
        path.push("vro_core_load_binary_test.bin");

        let payload: Vec<u8> = (0u8..64).collect();
        std::fs::write(&path, &payload).unwrap();

        let loaded = load_binary(&path).unwrap();
        assert_eq!(loaded, payload);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_binary_empty_file() {
        let mut path = std::env::temp_dir();
        path.push("vro_core_load_binary_empty.bin");

        std::fs::write(&path, []).unwrap();

        let loaded = load_binary(&path).unwrap();
        assert!(loaded.is_empty());

        let _ = std::fs::remove_file(&path);
    }
}
