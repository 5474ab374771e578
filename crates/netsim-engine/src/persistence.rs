//! Save file handling.
//!
//! A save is written to a sibling temporary file and renamed into place,
//! so an interrupted write never clobbers the previous save.

use std::path::{Path, PathBuf};

use netsim_core::SaveState;

use crate::error::EngineError;

/// Read a save file. Returns `None` when the file does not exist.
pub fn read_save(path: &Path) -> Result<Option<SaveState>, EngineError> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path).map_err(|source| EngineError::SaveFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(SaveState::from_json(&json)?))
}

/// Write a save file.
pub fn write_save(path: &Path, save: &SaveState) -> Result<(), EngineError> {
    let json = save.to_json()?;
    let staging = staging_path(path);
    std::fs::write(&staging, json).map_err(|source| EngineError::SaveFile {
        path: staging.clone(),
        source,
    })?;
    std::fs::rename(&staging, path).map_err(|source| EngineError::SaveFile {
        path: path.to_path_buf(),
        source,
    })
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use netsim_core::{Session, SimulationConfig};

    use super::*;

    fn temp_save(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("netsim-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn missing_file_reads_as_none() {
        let path = temp_save("missing");
        assert!(read_save(&path).unwrap().is_none());
    }

    #[test]
    fn written_save_restores_the_session() {
        let path = temp_save("roundtrip");
        let session = Session::new(SimulationConfig::default()).unwrap();
        write_save(&path, &session.save()).unwrap();

        let save = read_save(&path).unwrap().unwrap();
        let restored = Session::restore(SimulationConfig::default(), save).unwrap();

        assert_eq!(restored.now(), session.now());
        assert_eq!(restored.pool().len(), session.pool().len());
        assert!(!staging_path(&path).exists());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn corrupt_file_is_a_save_error() {
        let path = temp_save("corrupt");
        std::fs::write(&path, "{ not json").unwrap();

        let result = read_save(&path);

        assert!(matches!(result, Err(EngineError::Save { .. })));
        std::fs::remove_file(&path).unwrap();
    }
}
