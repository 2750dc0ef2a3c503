// FAT directory decoding: 32-byte records, long-name subentry
// composition, and case-insensitive lookup.
//
// LFN subentries physically precede their short entry with descending
// ordinals, so each subentry's code units are prepended to the pending
// buffer and the buffer is consumed by the next short entry.

use byteorder::{ByteOrder, LittleEndian};
use strata_core::{FsTimestamp, InspectorError};

use super::timestamps;
use crate::path::{decode_utf16_units, names_equal};

pub mod attributes {
    pub const ATTR_READ_ONLY: u8 = 0x01;
    pub const ATTR_HIDDEN: u8 = 0x02;
    pub const ATTR_SYSTEM: u8 = 0x04;
    pub const ATTR_VOLUME_ID: u8 = 0x08;
    pub const ATTR_DIRECTORY: u8 = 0x10;
    pub const ATTR_ARCHIVE: u8 = 0x20;
    pub const ATTR_LONG_NAME: u8 = 0x0F;
}

pub use attributes::*;

pub const ENTRY_LEN: usize = 32;
const ENTRY_DELETED: u8 = 0xE5;
const ENTRY_END: u8 = 0x00;

/// One decoded short entry, with its composed long name.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub long_name: String,
    pub attributes: u8,
    pub start_cluster: u32,
    pub size: u32,
    pub created: FsTimestamp,
    pub accessed: FsTimestamp,
    pub modified: FsTimestamp,
}

impl DirEntry {
    pub fn is_directory(&self) -> bool {
        // The synthetic dot entries are directories even when the
        // attribute byte disagrees on a damaged volume.
        self.is_dot() || self.attributes & ATTR_DIRECTORY != 0
    }

    pub fn is_volume_label(&self) -> bool {
        self.attributes & ATTR_VOLUME_ID != 0
    }

    pub fn is_system(&self) -> bool {
        self.attributes & ATTR_SYSTEM != 0
    }

    pub fn is_dot(&self) -> bool {
        self.long_name == "." || self.long_name == ".."
    }

    fn is_active(&self) -> bool {
        !self.is_volume_label() && !self.is_system()
    }
}

/// A fully decoded directory (all clusters of its chain).
pub struct Directory {
    pub entries: Vec<DirEntry>,
}

impl Directory {
    pub fn parse(data: &[u8]) -> Result<Directory, InspectorError> {
        if data.len() % ENTRY_LEN != 0 {
            return Err(InspectorError::BadDirectoryEntry(format!(
                "directory data length {} is not a multiple of {}",
                data.len(),
                ENTRY_LEN
            )));
        }

        let mut entries = Vec::new();
        let mut pending_lfn: Vec<u16> = Vec::new();

        for chunk in data.chunks_exact(ENTRY_LEN) {
            match chunk[0] {
                ENTRY_END => break,
                ENTRY_DELETED => {
                    pending_lfn.clear();
                    continue;
                }
                _ => {}
            }

            if chunk[0x0B] == ATTR_LONG_NAME {
                let mut units = lfn_units(chunk);
                units.extend_from_slice(&pending_lfn);
                pending_lfn = units;
                continue;
            }

            let long_name = if pending_lfn.is_empty() {
                compose_short_name(&chunk[0..11])
            } else {
                decode_utf16_units(&pending_lfn)
            };
            pending_lfn.clear();

            let cluster_hi = LittleEndian::read_u16(&chunk[0x14..0x16]) as u32;
            let cluster_lo = LittleEndian::read_u16(&chunk[0x1A..0x1C]) as u32;

            entries.push(DirEntry {
                long_name,
                attributes: chunk[0x0B],
                start_cluster: (cluster_hi << 16) | cluster_lo,
                size: LittleEndian::read_u32(&chunk[0x1C..0x20]),
                created: timestamps::creation(
                    LittleEndian::read_u16(&chunk[0x10..0x12]),
                    LittleEndian::read_u16(&chunk[0x0E..0x10]),
                    chunk[0x0D],
                ),
                accessed: timestamps::date_only(LittleEndian::read_u16(&chunk[0x12..0x14])),
                modified: timestamps::datetime(
                    LittleEndian::read_u16(&chunk[0x18..0x1A]),
                    LittleEndian::read_u16(&chunk[0x16..0x18]),
                ),
            });
        }

        Ok(Directory { entries })
    }

    /// Entries shown in listings: no labels, no system entries, no dot
    /// entries.
    pub fn active_entries(&self) -> Vec<&DirEntry> {
        self.entries
            .iter()
            .filter(|e| e.is_active() && !e.is_dot())
            .collect()
    }

    /// Case-insensitive lookup on composed long names.
    pub fn find(&self, name: &str) -> Option<&DirEntry> {
        self.entries
            .iter()
            .filter(|e| e.is_active() && !e.is_dot())
            .find(|e| names_equal(&e.long_name, name))
    }
}

/// Pull up to 13 UTF-16 code units out of one LFN subentry. Units stop
/// at the first 0x0000; 0xFFFF padding is stripped.
fn lfn_units(chunk: &[u8]) -> Vec<u16> {
    const SPANS: [(usize, usize); 3] = [(0x01, 5), (0x0E, 6), (0x1C, 2)];
    let mut units = Vec::with_capacity(13);
    'spans: for (start, count) in SPANS {
        for i in 0..count {
            let unit = LittleEndian::read_u16(&chunk[start + i * 2..start + i * 2 + 2]);
            if unit == 0x0000 {
                break 'spans;
            }
            if unit == 0xFFFF {
                continue;
            }
            units.push(unit);
        }
    }
    units
}

/// Compose "NAME.EXT" from the 11-byte 8.3 field. Trailing spaces trim
/// away; the dot is omitted when the extension is empty; the first byte
/// 0x05 stands in for a literal 0xE5.
fn compose_short_name(raw: &[u8]) -> String {
    let mut name = String::new();
    for (i, &b) in raw[0..8].iter().enumerate() {
        if b == 0x20 {
            break;
        }
        if i == 0 && b == 0x05 {
            name.push(0xE5 as char);
        } else {
            name.push(b as char);
        }
    }

    let ext: String = raw[8..11]
        .iter()
        .take_while(|&&b| b != 0x20)
        .map(|&b| b as char)
        .collect();

    if ext.is_empty() {
        name
    } else {
        format!("{}.{}", name, ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_entry(name83: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
        let mut raw = [0u8; 32];
        raw[0..11].copy_from_slice(name83);
        raw[0x0B] = attr;
        raw[0x10..0x12].copy_from_slice(&0x5661u16.to_le_bytes()); // created date
        raw[0x0E..0x10].copy_from_slice(&0x6000u16.to_le_bytes()); // created time
        raw[0x18..0x1A].copy_from_slice(&0x5661u16.to_le_bytes()); // modified date
        raw[0x16..0x18].copy_from_slice(&0x6000u16.to_le_bytes()); // modified time
        raw[0x14..0x16].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
        raw[0x1A..0x1C].copy_from_slice(&((cluster & 0xFFFF) as u16).to_le_bytes());
        raw[0x1C..0x20].copy_from_slice(&size.to_le_bytes());
        raw
    }

    fn lfn_entry(ordinal: u8, units: &[u16]) -> [u8; 32] {
        assert!(units.len() <= 13);
        let mut raw = [0u8; 32];
        raw[0] = ordinal;
        raw[0x0B] = ATTR_LONG_NAME;
        let slots: Vec<usize> = (0x01..0x0B)
            .step_by(2)
            .chain((0x0E..0x1A).step_by(2))
            .chain((0x1C..0x20).step_by(2))
            .collect();
        for (i, &slot) in slots.iter().enumerate() {
            let unit = match i.cmp(&units.len()) {
                std::cmp::Ordering::Less => units[i],
                std::cmp::Ordering::Equal => 0x0000,
                std::cmp::Ordering::Greater => 0xFFFF,
            };
            raw[slot..slot + 2].copy_from_slice(&unit.to_le_bytes());
        }
        raw
    }

    fn utf16(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn test_short_name_composition() {
        let mut data = Vec::new();
        data.extend_from_slice(&short_entry(b"README  TXT", ATTR_ARCHIVE, 3, 10));
        data.extend_from_slice(&short_entry(b"NOEXT      ", ATTR_ARCHIVE, 4, 0));
        let dir = Directory::parse(&data).unwrap();
        assert_eq!(dir.entries[0].long_name, "README.TXT");
        assert_eq!(dir.entries[1].long_name, "NOEXT");
    }

    #[test]
    fn test_lfn_composition_ordinal_order() {
        // Two subentries: 0x42 (last piece, carries the terminator) then
        // 0x01, then the short entry. The long name wins over 8.3.
        let name = "longfilename_example.txt"; // 24 chars
        let units = utf16(name);
        let mut data = Vec::new();
        data.extend_from_slice(&lfn_entry(0x42, &units[13..]));
        data.extend_from_slice(&lfn_entry(0x01, &units[..13]));
        data.extend_from_slice(&short_entry(b"LONGFI~1TXT", ATTR_ARCHIVE, 5, 128));
        let dir = Directory::parse(&data).unwrap();
        assert_eq!(dir.entries.len(), 1);
        assert_eq!(dir.entries[0].long_name, name);
        assert_eq!(dir.entries[0].start_cluster, 5);
    }

    #[test]
    fn test_exactly_thirteen_unit_piece() {
        // A full subentry has neither terminator nor padding.
        let name = "exactly13char"; // 13 chars
        let units = utf16(name);
        let mut data = Vec::new();
        data.extend_from_slice(&lfn_entry(0x41, &units));
        data.extend_from_slice(&short_entry(b"EXACTL~1   ", ATTR_ARCHIVE, 6, 1));
        let dir = Directory::parse(&data).unwrap();
        assert_eq!(dir.entries[0].long_name, name);
    }

    #[test]
    fn test_deleted_entry_clears_pending_lfn() {
        let mut deleted = short_entry(b"GONE    TXT", ATTR_ARCHIVE, 7, 0);
        deleted[0] = 0xE5;
        let mut data = Vec::new();
        data.extend_from_slice(&lfn_entry(0x41, &utf16("stale name")));
        data.extend_from_slice(&deleted);
        data.extend_from_slice(&short_entry(b"KEEP    TXT", ATTR_ARCHIVE, 8, 4));
        let dir = Directory::parse(&data).unwrap();
        assert_eq!(dir.entries.len(), 1);
        assert_eq!(dir.entries[0].long_name, "KEEP.TXT");
    }

    #[test]
    fn test_end_marker_stops_scan() {
        let mut data = Vec::new();
        data.extend_from_slice(&short_entry(b"FIRST   TXT", ATTR_ARCHIVE, 3, 1));
        data.extend_from_slice(&[0u8; 32]);
        data.extend_from_slice(&short_entry(b"UNSEEN  TXT", ATTR_ARCHIVE, 4, 1));
        let dir = Directory::parse(&data).unwrap();
        assert_eq!(dir.entries.len(), 1);
        assert_eq!(dir.entries[0].long_name, "FIRST.TXT");
    }

    #[test]
    fn test_dot_entries_recognized_but_not_listed() {
        let mut data = Vec::new();
        data.extend_from_slice(&short_entry(b".          ", ATTR_DIRECTORY, 5, 0));
        data.extend_from_slice(&short_entry(b"..         ", ATTR_DIRECTORY, 0, 0));
        data.extend_from_slice(&short_entry(b"SUB        ", ATTR_DIRECTORY, 9, 0));
        let dir = Directory::parse(&data).unwrap();
        assert_eq!(dir.entries[0].long_name, ".");
        assert_eq!(dir.entries[1].long_name, "..");
        assert!(dir.entries[1].is_directory());
        let active: Vec<_> = dir.active_entries().iter().map(|e| e.long_name.clone()).collect();
        assert_eq!(active, vec!["SUB"]);
    }

    #[test]
    fn test_label_and_system_filtered() {
        let mut data = Vec::new();
        data.extend_from_slice(&short_entry(b"MYVOLUME   ", ATTR_VOLUME_ID, 0, 0));
        data.extend_from_slice(&short_entry(b"SYSFILE    ", ATTR_SYSTEM, 10, 2));
        data.extend_from_slice(&short_entry(b"VISIBLE TXT", ATTR_ARCHIVE, 11, 2));
        let dir = Directory::parse(&data).unwrap();
        assert_eq!(dir.entries.len(), 3);
        let active: Vec<_> = dir.active_entries().iter().map(|e| e.long_name.clone()).collect();
        assert_eq!(active, vec!["VISIBLE.TXT"]);
        assert!(dir.find("sysfile").is_none());
    }

    #[test]
    fn test_find_case_insensitive_idempotent() {
        let mut data = Vec::new();
        data.extend_from_slice(&short_entry(b"HELLO   TXT", ATTR_ARCHIVE, 12, 5));
        let dir = Directory::parse(&data).unwrap();
        let found = dir.find("hello.txt").unwrap();
        assert_eq!(found.long_name, "HELLO.TXT");
        // Looking up the name the first lookup returned finds the same entry
        let again = dir.find(&found.long_name).unwrap();
        assert_eq!(again.long_name, found.long_name);
    }

    #[test]
    fn test_rejects_misaligned_data() {
        assert!(matches!(
            Directory::parse(&[0u8; 33]),
            Err(InspectorError::BadDirectoryEntry(_))
        ));
    }

    #[test]
    fn test_first_cluster_composition() {
        let entry = short_entry(b"BIG     BIN", ATTR_ARCHIVE, 0x0012_0034, 1);
        let dir = Directory::parse(&entry).unwrap();
        assert_eq!(dir.entries[0].start_cluster, 0x0012_0034);
    }
}
