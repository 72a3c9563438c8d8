//! Content loading from the file system

use hh_libretro::Loader;
use std::path::Path;

/// Reads content files whole
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl Loader for FileLoader {
    fn load(&mut self, path: &Path) -> std::io::Result<Vec<u8>> {
        let data = std::fs::read(path)?;
        tracing::debug!("Read {} bytes from {}", data.len(), path.display());
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.nes");
        std::fs::write(&path, [0x4e, 0x45, 0x53, 0x1a]).unwrap();

        let data = FileLoader.load(&path).unwrap();
        assert_eq!(data, vec![0x4e, 0x45, 0x53, 0x1a]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileLoader.load(&dir.path().join("missing.sfc")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
