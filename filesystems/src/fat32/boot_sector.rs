// FAT32 boot sector parsing.
// All multi-byte integers are little-endian; geometry is immutable after
// a successful parse.

use byteorder::{ByteOrder, LittleEndian};
use strata_core::InspectorError;

use crate::boot_sector::{
    valid_bytes_per_sector, valid_sectors_per_cluster, BOOT_SECTOR_LEN, FAT32_SIGNATURE,
};

#[derive(Debug, Clone)]
pub struct Fat32BootSector {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    /// Total volume size in sectors.
    pub total_sectors: u32,
    pub sectors_per_fat: u32,
    pub root_cluster: u32,
    pub fs_type: [u8; 8],
}

impl Fat32BootSector {
    pub fn parse(raw: &[u8]) -> Result<Self, InspectorError> {
        if raw.len() < BOOT_SECTOR_LEN {
            return Err(InspectorError::BadBootSector(format!(
                "boot sector is {} bytes, need {}",
                raw.len(),
                BOOT_SECTOR_LEN
            )));
        }

        let mut fs_type = [0u8; 8];
        fs_type.copy_from_slice(&raw[0x52..0x5A]);
        if &fs_type != FAT32_SIGNATURE {
            return Err(InspectorError::BadBootSector(
                "missing FAT32 type signature".into(),
            ));
        }

        let boot = Fat32BootSector {
            bytes_per_sector: LittleEndian::read_u16(&raw[0x0B..0x0D]),
            sectors_per_cluster: raw[0x0D],
            reserved_sectors: LittleEndian::read_u16(&raw[0x0E..0x10]),
            num_fats: raw[0x10],
            total_sectors: LittleEndian::read_u32(&raw[0x20..0x24]),
            sectors_per_fat: LittleEndian::read_u32(&raw[0x24..0x28]),
            root_cluster: LittleEndian::read_u32(&raw[0x2C..0x30]),
            fs_type,
        };

        if !valid_bytes_per_sector(boot.bytes_per_sector) {
            return Err(InspectorError::BadBootSector(format!(
                "bytes per sector {} is not a power of two in 512..=4096",
                boot.bytes_per_sector
            )));
        }
        if !valid_sectors_per_cluster(boot.sectors_per_cluster) {
            return Err(InspectorError::BadBootSector(format!(
                "sectors per cluster {} is not a power of two",
                boot.sectors_per_cluster
            )));
        }
        if boot.num_fats == 0 || boot.sectors_per_fat == 0 {
            return Err(InspectorError::BadBootSector(
                "FAT region has zero extent".into(),
            ));
        }
        if boot.root_cluster < 2 {
            return Err(InspectorError::BadBootSector(format!(
                "root directory cluster {} below first data cluster",
                boot.root_cluster
            )));
        }

        Ok(boot)
    }

    pub fn cluster_bytes(&self) -> u32 {
        self.bytes_per_sector as u32 * self.sectors_per_cluster as u32
    }

    /// First sector of the data region.
    pub fn data_start_sector(&self) -> u64 {
        self.reserved_sectors as u64 + self.num_fats as u64 * self.sectors_per_fat as u64
    }

    pub fn fat_start_byte(&self) -> u64 {
        self.reserved_sectors as u64 * self.bytes_per_sector as u64
    }

    pub fn fat_bytes(&self) -> usize {
        self.sectors_per_fat as usize * self.bytes_per_sector as usize
    }

    /// Absolute byte offset of a data cluster. Cluster 2 is the first
    /// data cluster.
    pub fn cluster_offset(&self, cluster: u32) -> Result<u64, InspectorError> {
        if cluster < 2 {
            return Err(InspectorError::ClusterOutOfRange(cluster));
        }
        let sector = self.data_start_sector()
            + (cluster as u64 - 2) * self.sectors_per_cluster as u64;
        Ok(sector * self.bytes_per_sector as u64)
    }

    pub fn fs_type_str(&self) -> String {
        String::from_utf8_lossy(&self.fs_type).into_owned()
    }
}
