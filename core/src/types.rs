// Value snapshots handed across the filesystem boundary.
// Callers get plain data, never references into parsed volume buffers.

use serde::{Deserialize, Serialize};

/// Attribute bitmask values shared by FAT32 directory entries and NTFS
/// DOS flags. `VOLUME_LABEL` is FAT-only, `DEVICE` is NTFS-only.
pub mod attr {
    pub const READ_ONLY: u32 = 0x01;
    pub const HIDDEN: u32 = 0x02;
    pub const SYSTEM: u32 = 0x04;
    pub const VOLUME_LABEL: u32 = 0x08;
    pub const DIRECTORY: u32 = 0x10;
    pub const ARCHIVE: u32 = 0x20;
    pub const DEVICE: u32 = 0x40;
}

/// Render a flag mask as attribute names. The NTFS `device` bit is kept in
/// the mask during parsing but never shown to users.
pub fn attribute_names(flags: u32) -> Vec<&'static str> {
    const NAMES: [(u32, &str); 6] = [
        (attr::READ_ONLY, "read_only"),
        (attr::HIDDEN, "hidden"),
        (attr::SYSTEM, "system"),
        (attr::VOLUME_LABEL, "volume_label"),
        (attr::DIRECTORY, "directory"),
        (attr::ARCHIVE, "archive"),
    ];
    NAMES
        .iter()
        .filter(|&&(bit, _)| flags & bit != 0)
        .map(|&(_, name)| name)
        .collect()
}

/// Broken-down timestamp. FAT32 stamps are volume-local time, NTFS stamps
/// are UTC; callers that render times must say which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsTimestamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
}

impl FsTimestamp {
    pub fn from_date(year: i32, month: u32, day: u32) -> Self {
        FsTimestamp {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
            microsecond: 0,
        }
    }
}

impl std::fmt::Display for FsTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// One directory entry as reported by `list` and `stat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryInfo {
    pub name: String,
    /// Raw attribute bitmask (see [`attr`]); directories report 0 size.
    pub flags: u32,
    pub size: u64,
    pub is_directory: bool,
    pub modified: FsTimestamp,
    pub created: Option<FsTimestamp>,
    /// FAT32: first cluster. NTFS: MFT file reference number.
    pub first_unit: u64,
    /// Display-oriented sector number (see the backend for its formula).
    pub sector: u64,
}

impl EntryInfo {
    pub fn attribute_names(&self) -> Vec<&'static str> {
        attribute_names(self.flags)
    }
}

/// Volume geometry as published by `describe`.
#[derive(Debug, Clone, Serialize)]
pub enum VolumeReport {
    Fat32 {
        bytes_per_sector: u16,
        sectors_per_cluster: u8,
        sectors_before_fat: u16,
        sectors_per_fat: u32,
        number_of_fats: u8,
        /// Total volume size in sectors.
        volume_size: u32,
        root_dir_cluster: u32,
        data_start_sector: u64,
        fat_type: String,
    },
    Ntfs {
        oem_id: String,
        /// Low 32 bits of the volume serial, rendered `XXXX-XXXX`.
        serial_number: String,
        bytes_per_sector: u16,
        sectors_per_cluster: u8,
        reserved_sectors: u16,
        /// Total volume size in sectors.
        volume_size: u64,
        mft_cluster: u64,
        mft_mirror_cluster: u64,
        /// MFT FILE record size in bytes.
        record_size: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_names_suppress_device() {
        let names = attribute_names(attr::ARCHIVE | attr::DEVICE | attr::READ_ONLY);
        assert_eq!(names, vec!["read_only", "archive"]);
    }

    #[test]
    fn test_attribute_names_order() {
        let names = attribute_names(attr::DIRECTORY | attr::HIDDEN);
        assert_eq!(names, vec!["hidden", "directory"]);
    }

    #[test]
    fn test_timestamp_display() {
        let ts = FsTimestamp {
            year: 2023,
            month: 3,
            day: 1,
            hour: 12,
            minute: 0,
            second: 0,
            microsecond: 0,
        };
        assert_eq!(ts.to_string(), "2023-03-01 12:00:00");
    }
}
