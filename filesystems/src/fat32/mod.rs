// FAT32 backend: boot sector geometry, the in-memory FAT, lazily cached
// directory listings, and file extraction over cluster chains.

pub mod boot_sector;
pub mod directory;
pub mod fat_table;
pub mod timestamps;

use std::collections::HashMap;

use log::{debug, info};
use strata_core::{BlockReader, EntryInfo, InspectorError, VolumeReport};

use crate::path::{names_equal, split_path};
use boot_sector::Fat32BootSector;
use directory::{DirEntry, Directory};
use fat_table::FatTable;

pub struct Fat32Volume {
    reader: BlockReader,
    boot: Fat32BootSector,
    fat: FatTable,
    /// First cluster of a directory -> its decoded listing. Unbounded:
    /// directory count is capped by the FAT itself.
    dir_cache: HashMap<u32, Directory>,
    volume_name: String,
    cwd_names: Vec<String>,
    cwd_clusters: Vec<u32>,
}

impl Fat32Volume {
    /// `boot_raw` is the sector-0 read the dispatcher already performed.
    pub fn open(
        mut reader: BlockReader,
        boot_raw: &[u8],
        volume_name: String,
    ) -> Result<Self, InspectorError> {
        let boot = Fat32BootSector::parse(boot_raw)?;

        let fat_raw = reader.read_at(boot.fat_start_byte(), boot.fat_bytes())?;
        let fat = FatTable::new(&fat_raw);

        info!("Opened FAT32 volume '{}'", volume_name);
        info!("  Bytes per sector: {}", boot.bytes_per_sector);
        info!("  Sectors per cluster: {}", boot.sectors_per_cluster);
        info!("  Data start: sector {}", boot.data_start_sector());
        info!("  Root cluster: {}", boot.root_cluster);
        info!("  FAT entries: {}", fat.len());

        let root_cluster = boot.root_cluster;
        let mut volume = Fat32Volume {
            reader,
            boot,
            fat,
            dir_cache: HashMap::new(),
            cwd_names: vec![volume_name.clone()],
            cwd_clusters: vec![root_cluster],
            volume_name,
        };
        // Prime the root listing so structural corruption surfaces at open
        volume.ensure_dir(root_cluster)?;
        Ok(volume)
    }

    pub fn volume_name(&self) -> &str {
        &self.volume_name
    }

    pub fn describe(&self) -> VolumeReport {
        VolumeReport::Fat32 {
            bytes_per_sector: self.boot.bytes_per_sector,
            sectors_per_cluster: self.boot.sectors_per_cluster,
            sectors_before_fat: self.boot.reserved_sectors,
            sectors_per_fat: self.boot.sectors_per_fat,
            number_of_fats: self.boot.num_fats,
            volume_size: self.boot.total_sectors,
            root_dir_cluster: self.boot.root_cluster,
            data_start_sector: self.boot.data_start_sector(),
            fat_type: self.boot.fs_type_str(),
        }
    }

    pub fn list(&mut self, path: &str) -> Result<Vec<EntryInfo>, InspectorError> {
        let (_, clusters) = self.resolve_from(path)?;
        let cluster = *clusters.last().unwrap();
        self.ensure_dir(cluster)?;
        let infos = self
            .dir(cluster)
            .active_entries()
            .into_iter()
            .map(|e| self.entry_info(e))
            .collect();
        Ok(infos)
    }

    pub fn stat(&mut self, path: &str) -> Result<EntryInfo, InspectorError> {
        let entry = self.locate(path)?;
        Ok(self.entry_info(&entry))
    }

    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>, InspectorError> {
        let entry = self.locate(path)?;
        if entry.is_directory() {
            return Err(InspectorError::IsDirectory(path.to_string()));
        }
        if entry.size == 0 || entry.start_cluster < 2 {
            return Ok(Vec::new());
        }
        let mut data = self.read_chain(entry.start_cluster)?;
        data.truncate(entry.size as usize);
        Ok(data)
    }

    pub fn read_text(&mut self, path: &str) -> Result<String, InspectorError> {
        let data = self.read_file(path)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    pub fn chdir(&mut self, path: &str) -> Result<(), InspectorError> {
        let (names, clusters) = self.resolve_from(path)?;
        self.cwd_names = names;
        self.cwd_clusters = clusters;
        Ok(())
    }

    pub fn cwd(&self) -> String {
        if self.cwd_names.len() == 1 {
            format!("{}/", self.cwd_names[0])
        } else {
            self.cwd_names.join("/")
        }
    }

    fn entry_info(&self, entry: &DirEntry) -> EntryInfo {
        let is_directory = entry.is_directory();
        // Cluster-to-sector display value. A zero start cluster cannot be
        // projected this way, so the data region start stands in for it.
        let sector = if entry.start_cluster == 0 {
            self.boot.data_start_sector()
        } else {
            entry.start_cluster as u64 * self.boot.sectors_per_cluster as u64
        };
        EntryInfo {
            name: entry.long_name.clone(),
            flags: entry.attributes as u32,
            size: if is_directory { 0 } else { entry.size as u64 },
            is_directory,
            modified: entry.modified,
            created: Some(entry.created),
            first_unit: entry.start_cluster as u64,
            sector,
        }
    }

    /// Resolve a path to a (names, clusters) stack, starting from the cwd
    /// or from the root when the first segment names the volume.
    fn resolve_from(&mut self, path: &str) -> Result<(Vec<String>, Vec<u32>), InspectorError> {
        let segments = split_path(path);
        self.resolve_segments(&segments)
    }

    fn resolve_segments(
        &mut self,
        segments: &[String],
    ) -> Result<(Vec<String>, Vec<u32>), InspectorError> {
        let mut names = self.cwd_names.clone();
        let mut clusters = self.cwd_clusters.clone();

        let mut rest = segments;
        if let Some(first) = segments.first() {
            if names_equal(first, &self.volume_name) {
                names = vec![self.volume_name.clone()];
                clusters = vec![self.boot.root_cluster];
                rest = &segments[1..];
            }
        }

        for segment in rest {
            match segment.as_str() {
                "." => {}
                ".." => {
                    if clusters.len() > 1 {
                        names.pop();
                        clusters.pop();
                    }
                }
                name => {
                    let current = *clusters.last().unwrap();
                    self.ensure_dir(current)?;
                    let entry = self
                        .dir(current)
                        .find(name)
                        .cloned()
                        .ok_or_else(|| InspectorError::NotFound(name.to_string()))?;
                    if !entry.is_directory() {
                        return Err(InspectorError::NotADirectory(name.to_string()));
                    }
                    // A zero start cluster is the virtual root back-reference;
                    // it is never looked up in the FAT.
                    let next = if entry.start_cluster == 0 {
                        self.boot.root_cluster
                    } else {
                        entry.start_cluster
                    };
                    names.push(entry.long_name.clone());
                    clusters.push(next);
                }
            }
        }

        Ok((names, clusters))
    }

    /// Find the directory entry a path names, without following it.
    fn locate(&mut self, path: &str) -> Result<DirEntry, InspectorError> {
        let segments = split_path(path);
        let Some((last, parent_segments)) = segments.split_last() else {
            return Err(InspectorError::NotFound(path.to_string()));
        };

        if last == "." || last == ".." || names_equal(last, &self.volume_name) {
            // The target is a directory position, not a name in its
            // parent; resolve fully, then look it up one level above.
            let (names, clusters) = self.resolve_segments(&segments)?;
            if clusters.len() < 2 {
                return Err(InspectorError::NotFound(path.to_string()));
            }
            let parent = clusters[clusters.len() - 2];
            let name = names.last().unwrap().clone();
            self.ensure_dir(parent)?;
            return self
                .dir(parent)
                .find(&name)
                .cloned()
                .ok_or(InspectorError::NotFound(name));
        }

        let (_, parent_clusters) = self.resolve_segments(parent_segments)?;
        let parent = *parent_clusters.last().unwrap();
        self.ensure_dir(parent)?;
        self.dir(parent)
            .find(last)
            .cloned()
            .ok_or_else(|| InspectorError::NotFound(last.to_string()))
    }

    fn ensure_dir(&mut self, cluster: u32) -> Result<(), InspectorError> {
        if self.dir_cache.contains_key(&cluster) {
            return Ok(());
        }
        debug!("Directory cache miss for cluster {}", cluster);
        let data = self.read_chain(cluster)?;
        let dir = Directory::parse(&data)?;
        self.dir_cache.insert(cluster, dir);
        Ok(())
    }

    fn dir(&self, cluster: u32) -> &Directory {
        &self.dir_cache[&cluster]
    }

    /// Concatenated bytes of every cluster in the chain from `start`.
    fn read_chain(&mut self, start: u32) -> Result<Vec<u8>, InspectorError> {
        let chain = self.fat.chain(start)?;
        let cluster_bytes = self.boot.cluster_bytes() as usize;
        let mut data = Vec::with_capacity(chain.len() * cluster_bytes);
        for cluster in chain {
            let offset = self.boot.cluster_offset(cluster)?;
            data.extend_from_slice(&self.reader.read_at(offset, cluster_bytes)?);
        }
        Ok(data)
    }
}
