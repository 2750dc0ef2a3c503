// NTFS boot sector parsing.
// The FILE record size comes from a signed byte: non-negative means a
// cluster count, negative means 2^|x| bytes.

use byteorder::{ByteOrder, LittleEndian};
use strata_core::InspectorError;

use crate::boot_sector::{
    valid_bytes_per_sector, valid_sectors_per_cluster, BOOT_SECTOR_LEN, NTFS_OEM_ID,
};

#[derive(Debug, Clone)]
pub struct NtfsBootSector {
    pub oem_id: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    /// Total volume size in sectors.
    pub total_sectors: u64,
    pub mft_lcn: u64,
    pub mft_mirror_lcn: u64,
    pub clusters_per_record: i8,
    pub serial_number: u64,
}

impl NtfsBootSector {
    pub fn parse(raw: &[u8]) -> Result<Self, InspectorError> {
        if raw.len() < BOOT_SECTOR_LEN {
            return Err(InspectorError::BadBootSector(format!(
                "boot sector is {} bytes, need {}",
                raw.len(),
                BOOT_SECTOR_LEN
            )));
        }

        let mut oem_id = [0u8; 8];
        oem_id.copy_from_slice(&raw[0x03..0x0B]);
        if &oem_id != NTFS_OEM_ID {
            return Err(InspectorError::BadBootSector("missing NTFS OEM id".into()));
        }

        let boot = NtfsBootSector {
            oem_id,
            bytes_per_sector: LittleEndian::read_u16(&raw[0x0B..0x0D]),
            sectors_per_cluster: raw[0x0D],
            reserved_sectors: LittleEndian::read_u16(&raw[0x0E..0x10]),
            total_sectors: LittleEndian::read_u64(&raw[0x28..0x30]),
            mft_lcn: LittleEndian::read_u64(&raw[0x30..0x38]),
            mft_mirror_lcn: LittleEndian::read_u64(&raw[0x38..0x40]),
            clusters_per_record: raw[0x40] as i8,
            serial_number: LittleEndian::read_u64(&raw[0x48..0x50]),
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
        if boot.record_size() == 0 || boot.record_size() > 64 * 1024 {
            return Err(InspectorError::BadBootSector(format!(
                "implausible FILE record size {}",
                boot.record_size()
            )));
        }

        Ok(boot)
    }

    pub fn cluster_bytes(&self) -> u64 {
        self.bytes_per_sector as u64 * self.sectors_per_cluster as u64
    }

    /// FILE record size in bytes.
    pub fn record_size(&self) -> u64 {
        if self.clusters_per_record >= 0 {
            self.clusters_per_record as u64 * self.cluster_bytes()
        } else {
            1u64 << (-(self.clusters_per_record as i32))
        }
    }

    /// Low 32 bits of the serial, rendered `XXXX-XXXX`.
    pub fn serial_display(&self) -> String {
        let low = (self.serial_number & 0xFFFF_FFFF) as u32;
        let hex = format!("{:08X}", low);
        format!("{}-{}", &hex[..4], &hex[4..])
    }

    pub fn oem_id_str(&self) -> String {
        String::from_utf8_lossy(&self.oem_id).into_owned()
    }
}
