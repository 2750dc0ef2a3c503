// Filesystem-agnostic façade.
// One boot-sector read picks the backend; after that every operation
// dispatches on the variant. The block handle is owned by the backend
// and dropped on every failed open path.

use std::fs::File;
use std::path::Path;

use log::info;
use strata_core::{BlockReader, EntryInfo, InspectorError, VolumeReport};

use crate::boot_sector::{FilesystemKind, BOOT_SECTOR_LEN};
use crate::fat32::Fat32Volume;
use crate::ntfs::NtfsVolume;

pub enum Volume {
    Fat32(Fat32Volume),
    Ntfs(NtfsVolume),
}

impl Volume {
    /// Open a raw device or image file read-only and mount the
    /// filesystem found in its boot sector.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Volume, InspectorError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let reader = BlockReader::open(path)?;
        Self::mount(reader, name)
    }

    /// Mount an already-open handle under the given volume name.
    pub fn from_file(file: File, volume_name: &str) -> Result<Volume, InspectorError> {
        let reader = BlockReader::from_file(file)?;
        Self::mount(reader, volume_name.to_string())
    }

    fn mount(mut reader: BlockReader, name: String) -> Result<Volume, InspectorError> {
        let boot = reader.read_at(0, BOOT_SECTOR_LEN)?;
        match FilesystemKind::detect(&boot) {
            Some(FilesystemKind::Fat32) => {
                info!("Boot sector of '{}' identifies FAT32", name);
                Ok(Volume::Fat32(Fat32Volume::open(reader, &boot, name)?))
            }
            Some(FilesystemKind::Ntfs) => {
                info!("Boot sector of '{}' identifies NTFS", name);
                Ok(Volume::Ntfs(NtfsVolume::open(reader, &boot, name)?))
            }
            None => Err(InspectorError::UnknownFilesystem),
        }
    }

    pub fn volume_name(&self) -> &str {
        match self {
            Volume::Fat32(v) => v.volume_name(),
            Volume::Ntfs(v) => v.volume_name(),
        }
    }

    /// Volume geometry as a plain record.
    pub fn describe(&self) -> VolumeReport {
        match self {
            Volume::Fat32(v) => v.describe(),
            Volume::Ntfs(v) => v.describe(),
        }
    }

    /// List a directory. Paths resolve against the cwd, or against the
    /// root when the first segment names the volume; directories report
    /// size zero.
    pub fn list(&mut self, path: &str) -> Result<Vec<EntryInfo>, InspectorError> {
        match self {
            Volume::Fat32(v) => v.list(path),
            Volume::Ntfs(v) => v.list(path),
        }
    }

    pub fn stat(&mut self, path: &str) -> Result<EntryInfo, InspectorError> {
        match self {
            Volume::Fat32(v) => v.stat(path),
            Volume::Ntfs(v) => v.stat(path),
        }
    }

    /// Raw file content, up to the entry's recorded size.
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>, InspectorError> {
        match self {
            Volume::Fat32(v) => v.read_file(path),
            Volume::Ntfs(v) => v.read_file(path),
        }
    }

    /// File content decoded as UTF-8, invalid sequences replaced.
    pub fn read_text(&mut self, path: &str) -> Result<String, InspectorError> {
        match self {
            Volume::Fat32(v) => v.read_text(path),
            Volume::Ntfs(v) => v.read_text(path),
        }
    }

    pub fn chdir(&mut self, path: &str) -> Result<(), InspectorError> {
        match self {
            Volume::Fat32(v) => v.chdir(path),
            Volume::Ntfs(v) => v.chdir(path),
        }
    }

    pub fn cwd(&self) -> String {
        match self {
            Volume::Fat32(v) => v.cwd(),
            Volume::Ntfs(v) => v.cwd(),
        }
    }
}
