//! Ordered on-disk entity store. One MessagePack file per guid.

use crate::core::{Entity, Guid, Result, SphynxError};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const ENTITY_EXTENSION: &str = "sphynx";

pub struct OrderedDiskStore {
    data_dir: PathBuf,
}

impl OrderedDiskStore {
    /// Opens the store rooted at `data_dir`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir).map_err(|e| {
            SphynxError::Persistence(format!(
                "Failed to create data directory '{}': {}",
                data_dir.display(),
                e
            ))
        })?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn save(&self, guid: &Guid, entity: &Entity) -> Result<()> {
        let path = self.entity_path(guid)?;
        let serialized = rmp_serde::to_vec(entity).map_err(|e| {
            SphynxError::Persistence(format!("Failed to serialize {}: {}", guid, e))
        })?;

        // Write next to the target and rename, so readers never see a torn file.
        let temp = NamedTempFile::new_in(&self.data_dir)
            .map_err(|e| SphynxError::Persistence(format!("Failed to create temp file: {}", e)))?;
        let mut writer = BufWriter::new(temp);
        writer
            .write_all(&serialized)
            .map_err(|e| SphynxError::Persistence(format!("Failed to write {}: {}", guid, e)))?;
        let temp = writer
            .into_inner()
            .map_err(|e| SphynxError::Persistence(format!("Failed to flush {}: {}", guid, e)))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| SphynxError::Persistence(format!("Failed to sync {}: {}", guid, e)))?;
        temp.persist(&path).map_err(|e| {
            SphynxError::Persistence(format!("Failed to move {} into place: {}", guid, e.error))
        })?;
        Ok(())
    }

    pub fn load(&self, guid: &Guid) -> Result<Entity> {
        let path = self.entity_path(guid)?;
        let mut file = File::open(&path)
            .map_err(|e| SphynxError::Persistence(format!("Failed to open {}: {}", guid, e)))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| SphynxError::Persistence(format!("Failed to read {}: {}", guid, e)))?;
        rmp_serde::from_slice(&data).map_err(|e| {
            SphynxError::Persistence(format!("Failed to deserialize {}: {}", guid, e))
        })
    }

    pub fn exists(&self, guid: &Guid) -> Result<bool> {
        let path = self.entity_path(guid)?;
        path.try_exists().map_err(|e| {
            SphynxError::Persistence(format!("Failed to probe {}: {}", guid, e))
        })
    }

    fn entity_path(&self, guid: &Guid) -> Result<PathBuf> {
        validate_guid(guid)?;
        Ok(self
            .data_dir
            .join(format!("{}.{}", guid.as_str(), ENTITY_EXTENSION)))
    }
}

/// Guids become file names, so anything that could escape the data
/// directory is refused.
fn validate_guid(guid: &Guid) -> Result<()> {
    let raw = guid.as_str();
    if raw.is_empty() || raw.contains('/') || raw.contains('\\') || raw.contains("..") {
        return Err(SphynxError::InvalidGuid(raw.to_string()));
    }
    Ok(())
}
