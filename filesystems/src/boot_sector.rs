// Filesystem detection from sector 0.
// FAT32 and NTFS are told apart by their fixed signature strings; the
// backends do the full geometry parse afterwards.

/// Byte length of the boot sector read used for detection.
pub const BOOT_SECTOR_LEN: usize = 512;

pub const FAT32_SIGNATURE: &[u8; 8] = b"FAT32   ";
pub const NTFS_OEM_ID: &[u8; 8] = b"NTFS    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilesystemKind {
    Fat32,
    Ntfs,
}

impl FilesystemKind {
    /// Inspect the first sector of a volume. Returns `None` when neither
    /// signature matches.
    pub fn detect(boot: &[u8]) -> Option<FilesystemKind> {
        if boot.len() < BOOT_SECTOR_LEN {
            return None;
        }
        if &boot[0x52..0x5A] == FAT32_SIGNATURE {
            return Some(FilesystemKind::Fat32);
        }
        if &boot[0x03..0x0B] == NTFS_OEM_ID {
            return Some(FilesystemKind::Ntfs);
        }
        None
    }
}

/// Geometry sanity shared by both backends.
pub fn valid_bytes_per_sector(bps: u16) -> bool {
    (512..=4096).contains(&bps) && bps.is_power_of_two()
}

pub fn valid_sectors_per_cluster(spc: u8) -> bool {
    spc != 0 && spc.is_power_of_two()
}
