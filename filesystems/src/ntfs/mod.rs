// NTFS backend: boot sector geometry, a single pass over the MFT, and a
// validated directory tree. Reads never touch the volume again except to
// pull non-resident file content.

pub mod boot_sector;
pub mod data_runs;
pub mod mft;
pub mod timestamps;
pub mod tree;

use log::{debug, info, trace};
use strata_core::{BlockReader, EntryInfo, InspectorError, VolumeReport};

use crate::path::{names_equal, split_path};
use boot_sector::NtfsBootSector;
use mft::{FileData, MftRecord, FILE_SIGNATURE};
use tree::DirectoryTree;

pub struct NtfsVolume {
    reader: BlockReader,
    boot: NtfsBootSector,
    tree: DirectoryTree,
    volume_name: String,
    cwd_names: Vec<String>,
    cwd_ids: Vec<u64>,
}

impl NtfsVolume {
    /// `boot_raw` is the sector-0 read the dispatcher already performed.
    pub fn open(
        mut reader: BlockReader,
        boot_raw: &[u8],
        volume_name: String,
    ) -> Result<Self, InspectorError> {
        let boot = NtfsBootSector::parse(boot_raw)?;
        let record_size = boot.record_size() as usize;
        let cluster_bytes = boot.cluster_bytes();
        let mft_offset = boot.mft_lcn * cluster_bytes;

        // $MFT's own record bounds the scan
        let mft_raw = reader.read_at(mft_offset, record_size)?;
        if &mft_raw[0..4] != FILE_SIGNATURE {
            return Err(InspectorError::BadMftRecord(
                "$MFT record 0 has no FILE signature".into(),
            ));
        }
        let mft_record = MftRecord::parse(&mft_raw)?;
        let mft_bytes = match &mft_record.data {
            FileData::NonResident { size, runs } => {
                let run_bytes = runs
                    .first()
                    .map(|r| r.length * cluster_bytes)
                    .unwrap_or(0);
                if run_bytes == 0 {
                    *size
                } else {
                    (*size).min(run_bytes)
                }
            }
            FileData::Resident { content } => content.len() as u64,
        };
        let record_count = (mft_bytes / record_size as u64) as usize;

        let mut records = Vec::new();
        for index in 1..record_count {
            let raw = reader.read_at(mft_offset + (index * record_size) as u64, record_size)?;
            if &raw[0..4] != FILE_SIGNATURE {
                // Non-FILE blocks exist inside the MFT region; skip them
                trace!("MFT slot {} has no FILE signature", index);
                continue;
            }
            match MftRecord::parse(&raw) {
                Ok(record) => records.push(record),
                Err(err) => debug!("MFT slot {} dropped: {}", index, err),
            }
        }

        info!("Opened NTFS volume '{}'", volume_name);
        info!("  Bytes per sector: {}", boot.bytes_per_sector);
        info!("  Sectors per cluster: {}", boot.sectors_per_cluster);
        info!("  MFT at cluster {}, record size {}", boot.mft_lcn, record_size);
        info!("  Parsed {} of {} MFT slots", records.len(), record_count);

        let tree = DirectoryTree::build(records)?;
        let root_id = tree.root_id();

        Ok(NtfsVolume {
            reader,
            boot,
            tree,
            cwd_names: vec![volume_name.clone()],
            cwd_ids: vec![root_id],
            volume_name,
        })
    }

    pub fn volume_name(&self) -> &str {
        &self.volume_name
    }

    pub fn describe(&self) -> VolumeReport {
        VolumeReport::Ntfs {
            oem_id: self.boot.oem_id_str(),
            serial_number: self.boot.serial_display(),
            bytes_per_sector: self.boot.bytes_per_sector,
            sectors_per_cluster: self.boot.sectors_per_cluster,
            reserved_sectors: self.boot.reserved_sectors,
            volume_size: self.boot.total_sectors,
            mft_cluster: self.boot.mft_lcn,
            mft_mirror_cluster: self.boot.mft_mirror_lcn,
            record_size: self.boot.record_size(),
        }
    }

    pub fn list(&mut self, path: &str) -> Result<Vec<EntryInfo>, InspectorError> {
        let (_, ids) = self.resolve_from(path)?;
        let dir = *ids.last().unwrap();
        Ok(self
            .tree
            .active_children(dir)
            .into_iter()
            .map(|r| self.entry_info(r))
            .collect())
    }

    pub fn stat(&mut self, path: &str) -> Result<EntryInfo, InspectorError> {
        let record = self.locate(path)?;
        Ok(self.entry_info(&record))
    }

    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>, InspectorError> {
        let record = self.locate(path)?;
        if record.is_directory {
            return Err(InspectorError::IsDirectory(path.to_string()));
        }

        match &record.data {
            FileData::Resident { content } => Ok(content.clone()),
            FileData::NonResident { size, runs } => {
                if *size == 0 {
                    return Ok(Vec::new());
                }
                // Only the first run is backed by reads; anything needing
                // more is reported, not silently truncated.
                if runs.len() != 1 {
                    return Err(InspectorError::FragmentedUnsupported(path.to_string()));
                }
                let run = &runs[0];
                let Some(lcn) = run.lcn else {
                    return Err(InspectorError::FragmentedUnsupported(path.to_string()));
                };
                let cluster_bytes = self.boot.cluster_bytes();
                let run_bytes = run.length * cluster_bytes;
                if *size > run_bytes {
                    return Err(InspectorError::FragmentedUnsupported(path.to_string()));
                }
                self.reader.read_at(lcn * cluster_bytes, *size as usize)
            }
        }
    }

    pub fn read_text(&mut self, path: &str) -> Result<String, InspectorError> {
        let data = self.read_file(path)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    pub fn chdir(&mut self, path: &str) -> Result<(), InspectorError> {
        let (names, ids) = self.resolve_from(path)?;
        self.cwd_names = names;
        self.cwd_ids = ids;
        Ok(())
    }

    pub fn cwd(&self) -> String {
        if self.cwd_names.len() == 1 {
            format!("{}/", self.cwd_names[0])
        } else {
            self.cwd_names.join("/")
        }
    }

    fn entry_info(&self, record: &MftRecord) -> EntryInfo {
        let spc = self.boot.sectors_per_cluster as u64;
        // Display-oriented sector: resident content lives inside the MFT,
        // so the record index projects onto the MFT's sector range
        let sector = match &record.data {
            FileData::Resident { .. } => self.boot.mft_lcn * spc + record.file_id,
            FileData::NonResident { runs, .. } => {
                runs.first().and_then(|r| r.lcn).unwrap_or(0) * spc
            }
        };
        EntryInfo {
            name: record.long_name().to_string(),
            flags: record.visible_flags(),
            size: if record.is_directory {
                0
            } else {
                record.data.size()
            },
            is_directory: record.is_directory,
            modified: timestamps::filetime_to_components(record.standard_info.modified),
            created: Some(timestamps::filetime_to_components(
                record.standard_info.created,
            )),
            first_unit: record.file_id,
            sector,
        }
    }

    fn resolve_from(&self, path: &str) -> Result<(Vec<String>, Vec<u64>), InspectorError> {
        let segments = split_path(path);
        self.resolve_segments(&segments)
    }

    fn resolve_segments(
        &self,
        segments: &[String],
    ) -> Result<(Vec<String>, Vec<u64>), InspectorError> {
        let mut names = self.cwd_names.clone();
        let mut ids = self.cwd_ids.clone();

        let mut rest = segments;
        if let Some(first) = segments.first() {
            if names_equal(first, &self.volume_name) {
                names = vec![self.volume_name.clone()];
                ids = vec![self.tree.root_id()];
                rest = &segments[1..];
            }
        }

        for segment in rest {
            match segment.as_str() {
                "." => {}
                ".." => {
                    if ids.len() > 1 {
                        names.pop();
                        ids.pop();
                    }
                }
                name => {
                    let current = *ids.last().unwrap();
                    let record = self
                        .tree
                        .find(current, name)
                        .ok_or_else(|| InspectorError::NotFound(name.to_string()))?;
                    if !record.is_directory {
                        return Err(InspectorError::NotADirectory(name.to_string()));
                    }
                    names.push(record.long_name().to_string());
                    ids.push(record.file_id);
                }
            }
        }

        Ok((names, ids))
    }

    fn locate(&self, path: &str) -> Result<MftRecord, InspectorError> {
        let segments = split_path(path);
        let Some((last, parent_segments)) = segments.split_last() else {
            return Err(InspectorError::NotFound(path.to_string()));
        };

        if last == "." || last == ".." || names_equal(last, &self.volume_name) {
            let (_, ids) = self.resolve_segments(&segments)?;
            let id = *ids.last().unwrap();
            if ids.len() < 2 {
                return Err(InspectorError::NotFound(path.to_string()));
            }
            return self
                .tree
                .record(id)
                .cloned()
                .ok_or_else(|| InspectorError::NotFound(path.to_string()));
        }

        let (_, parent_ids) = self.resolve_segments(parent_segments)?;
        let parent = *parent_ids.last().unwrap();
        self.tree
            .find(parent, last)
            .cloned()
            .ok_or_else(|| InspectorError::NotFound(last.to_string()))
    }
}
