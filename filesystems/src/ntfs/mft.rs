// MFT FILE record parsing.
// A record is a FILE signature, a fixed header, then a packed attribute
// stream. Only STANDARD_INFORMATION, FILE_NAME, the unnamed DATA stream
// and INDEX_ROOT are interpreted; everything else is stepped over.

use byteorder::{ByteOrder, LittleEndian};
use strata_core::types::attr;
use strata_core::InspectorError;

use super::data_runs::{decode_data_runs, DataRun};
use crate::path::decode_utf16le;

pub const FILE_SIGNATURE: &[u8; 4] = b"FILE";

pub const ATTR_STANDARD_INFORMATION: u32 = 0x10;
pub const ATTR_FILE_NAME: u32 = 0x30;
pub const ATTR_DATA: u32 = 0x80;
pub const ATTR_INDEX_ROOT: u32 = 0x90;
pub const ATTR_END: u32 = 0xFFFF_FFFF;

const RECORD_FLAG_IN_USE: u8 = 0x01;
const RECORD_FLAG_DIRECTORY: u8 = 0x02;

#[derive(Debug, Clone)]
pub struct StandardInfo {
    /// Creation FILETIME.
    pub created: u64,
    /// Last-modification FILETIME.
    pub modified: u64,
    /// DOS attribute flags; the `device` bit stays in this raw mask and
    /// is suppressed only in user-visible views.
    pub dos_flags: u32,
}

#[derive(Debug, Clone)]
pub struct FileName {
    /// Low 6 bytes of the parent MFT reference.
    pub parent_id: u64,
    pub long_name: String,
}

#[derive(Debug, Clone)]
pub enum FileData {
    Resident { content: Vec<u8> },
    NonResident { size: u64, runs: Vec<DataRun> },
}

impl FileData {
    pub fn size(&self) -> u64 {
        match self {
            FileData::Resident { content } => content.len() as u64,
            FileData::NonResident { size, .. } => *size,
        }
    }

    pub fn is_resident(&self) -> bool {
        matches!(self, FileData::Resident { .. })
    }
}

#[derive(Debug, Clone)]
pub struct MftRecord {
    pub file_id: u64,
    pub standard_info: StandardInfo,
    pub file_name: FileName,
    pub data: FileData,
    pub is_directory: bool,
}

impl MftRecord {
    /// Parse one FILE record. The caller has already matched the FILE
    /// signature; records that are structurally broken, unused, or
    /// nameless fail here and are dropped by the scanner.
    pub fn parse(raw: &[u8]) -> Result<Self, InspectorError> {
        if raw.len() < 0x30 || &raw[0..4] != FILE_SIGNATURE {
            return Err(InspectorError::BadMftRecord(
                "missing FILE signature".into(),
            ));
        }

        let record_flags = raw[0x16];
        if record_flags & RECORD_FLAG_IN_USE == 0 {
            return Err(InspectorError::Deleted);
        }

        let file_id = LittleEndian::read_u32(&raw[0x2C..0x30]) as u64;
        let first_attribute_offset = LittleEndian::read_u16(&raw[0x14..0x16]) as usize;

        let mut standard_info = None;
        let mut file_name = None;
        let mut data = None;
        let mut has_index_root = false;

        let mut pos = first_attribute_offset;
        loop {
            let attr_type = read_u32(raw, pos)?;
            if attr_type == ATTR_END {
                break;
            }
            let attr_len = read_u32(raw, pos + 4)? as usize;
            if attr_len < 0x10 || pos + attr_len > raw.len() {
                return Err(InspectorError::BadMftRecord(format!(
                    "attribute {:#x} at {:#x} has bad length {}",
                    attr_type, pos, attr_len
                )));
            }
            let body = &raw[pos..pos + attr_len];

            match attr_type {
                ATTR_STANDARD_INFORMATION => {
                    standard_info = Some(parse_standard_info(body)?);
                }
                ATTR_FILE_NAME => {
                    if file_name.is_none() {
                        file_name = Some(parse_file_name(body)?);
                    }
                }
                ATTR_DATA => {
                    // Named DATA attributes are alternate streams; only
                    // the unnamed one is read.
                    if data.is_none() && body[0x09] == 0 {
                        data = Some(parse_data(body)?);
                    }
                }
                ATTR_INDEX_ROOT => {
                    has_index_root = true;
                }
                _ => {}
            }

            pos += attr_len;
        }

        let standard_info = standard_info.ok_or_else(|| {
            InspectorError::BadMftRecord("no STANDARD_INFORMATION attribute".into())
        })?;
        let file_name = file_name.ok_or(InspectorError::NoName)?;

        let is_directory = record_flags & RECORD_FLAG_DIRECTORY != 0
            || has_index_root
            || standard_info.dos_flags & attr::DIRECTORY != 0;

        // Directories carry their children in the index, not in DATA
        let data = if has_index_root {
            FileData::Resident {
                content: Vec::new(),
            }
        } else {
            data.unwrap_or(FileData::Resident {
                content: Vec::new(),
            })
        };

        Ok(MftRecord {
            file_id,
            standard_info,
            file_name,
            data,
            is_directory,
        })
    }

    pub fn long_name(&self) -> &str {
        &self.file_name.long_name
    }

    pub fn parent_id(&self) -> u64 {
        self.file_name.parent_id
    }

    /// Records with the hidden or system bit set are left out of
    /// listings.
    pub fn is_active(&self) -> bool {
        self.standard_info.dos_flags & (attr::HIDDEN | attr::SYSTEM) == 0
    }

    /// User-visible flag mask: the device bit is suppressed, the
    /// directory bit is reconciled with the record's directory state.
    pub fn visible_flags(&self) -> u32 {
        let mut flags = self.standard_info.dos_flags & !attr::DEVICE;
        if self.is_directory {
            flags |= attr::DIRECTORY;
        }
        flags
    }
}

fn parse_standard_info(body: &[u8]) -> Result<StandardInfo, InspectorError> {
    let value_offset = read_u16(body, 0x14)? as usize;
    Ok(StandardInfo {
        created: read_u64(body, value_offset)?,
        modified: read_u64(body, value_offset + 8)?,
        dos_flags: read_u32(body, value_offset + 32)?,
    })
}

fn parse_file_name(body: &[u8]) -> Result<FileName, InspectorError> {
    let value_size = read_u32(body, 0x10)? as usize;
    let value_offset = read_u16(body, 0x14)? as usize;
    let value = body
        .get(value_offset..value_offset + value_size)
        .ok_or_else(|| InspectorError::BadMftRecord("FILE_NAME value out of bounds".into()))?;

    if value.len() < 66 {
        return Err(InspectorError::BadMftRecord(
            "FILE_NAME value too short".into(),
        ));
    }
    // 8-byte MFT reference; the high 2 bytes are a sequence number
    let mut reference = [0u8; 8];
    reference[0..6].copy_from_slice(&value[0..6]);
    let parent_id = LittleEndian::read_u64(&reference);

    // A name is required here, so a truncated one is fatal for the record
    let name_length = value[64] as usize;
    let name_bytes = value
        .get(66..66 + name_length * 2)
        .ok_or_else(|| InspectorError::Decode("FILE_NAME text truncated".into()))?;

    Ok(FileName {
        parent_id,
        long_name: decode_utf16le(name_bytes),
    })
}

fn parse_data(body: &[u8]) -> Result<FileData, InspectorError> {
    let non_resident = body[0x08] != 0;

    if !non_resident {
        let size = read_u32(body, 0x10)? as usize;
        let content_offset = read_u16(body, 0x14)? as usize;
        let content = body
            .get(content_offset..content_offset + size)
            .ok_or_else(|| InspectorError::BadMftRecord("resident DATA out of bounds".into()))?
            .to_vec();
        return Ok(FileData::Resident { content });
    }

    let size = read_u64(body, 0x30)?;
    let runs = decode_data_runs(
        body.get(0x40..)
            .ok_or_else(|| InspectorError::BadMftRecord("runlist out of bounds".into()))?,
    )?;
    Ok(FileData::NonResident { size, runs })
}

fn read_u16(raw: &[u8], offset: usize) -> Result<u16, InspectorError> {
    raw.get(offset..offset + 2)
        .map(LittleEndian::read_u16)
        .ok_or_else(|| InspectorError::BadMftRecord(format!("read past record at {:#x}", offset)))
}

fn read_u32(raw: &[u8], offset: usize) -> Result<u32, InspectorError> {
    raw.get(offset..offset + 4)
        .map(LittleEndian::read_u32)
        .ok_or_else(|| InspectorError::BadMftRecord(format!("read past record at {:#x}", offset)))
}

fn read_u64(raw: &[u8], offset: usize) -> Result<u64, InspectorError> {
    raw.get(offset..offset + 8)
        .map(LittleEndian::read_u64)
        .ok_or_else(|| InspectorError::BadMftRecord(format!("read past record at {:#x}", offset)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ntfs_image::RecordBuilder;

    fn basic_record(file_id: u32, parent: u64, name: &str) -> RecordBuilder {
        let mut b = RecordBuilder::new(file_id, true, false);
        b.standard_info(0, 0, 0);
        b.file_name(parent, name);
        b
    }

    #[test]
    fn test_resident_data_content() {
        let mut b = basic_record(7, 5, "readme.txt");
        b.resident_data(b"hello world");
        let record = MftRecord::parse(&b.finish()).unwrap();
        assert_eq!(record.file_id, 7);
        assert_eq!(record.long_name(), "readme.txt");
        assert_eq!(record.parent_id(), 5);
        assert!(!record.is_directory);
        match &record.data {
            FileData::Resident { content } => assert_eq!(content, b"hello world"),
            _ => panic!("expected resident data"),
        }
        assert_eq!(record.data.size(), 11);
    }

    #[test]
    fn test_non_resident_first_run() {
        let mut b = basic_record(9, 5, "big.bin");
        // 3 clusters at LCN 0x60
        b.non_resident_data(5000, &[0x11, 0x03, 0x60, 0x00]);
        let record = MftRecord::parse(&b.finish()).unwrap();
        match &record.data {
            FileData::NonResident { size, runs } => {
                assert_eq!(*size, 5000);
                assert_eq!(runs.len(), 1);
                assert_eq!(runs[0].lcn, Some(0x60));
                assert_eq!(runs[0].length, 3);
            }
            _ => panic!("expected non-resident data"),
        }
    }

    #[test]
    fn test_index_root_forces_directory() {
        let mut b = basic_record(11, 5, "docs");
        b.index_root();
        let record = MftRecord::parse(&b.finish()).unwrap();
        assert!(record.is_directory);
        assert_eq!(record.data.size(), 0);
        assert!(record.visible_flags() & attr::DIRECTORY != 0);
    }

    #[test]
    fn test_unused_record_is_deleted() {
        let mut b = RecordBuilder::new(13, false, false);
        b.standard_info(0, 0, 0);
        b.file_name(5, "gone.txt");
        assert!(matches!(
            MftRecord::parse(&b.finish()),
            Err(InspectorError::Deleted)
        ));
    }

    #[test]
    fn test_record_without_file_name_dropped() {
        let mut b = RecordBuilder::new(14, true, false);
        b.standard_info(0, 0, 0);
        b.resident_data(b"x");
        assert!(matches!(
            MftRecord::parse(&b.finish()),
            Err(InspectorError::NoName)
        ));
    }

    #[test]
    fn test_unknown_attribute_skipped() {
        let mut b = basic_record(15, 5, "obj.txt");
        // 0x40 OBJECT_ID: stepped over without interpretation
        b.push_attr(0x40, &[0u8; 16], &[0u8; 16]);
        b.resident_data(b"ok");
        let record = MftRecord::parse(&b.finish()).unwrap();
        assert_eq!(record.data.size(), 2);
    }

    #[test]
    fn test_bad_attribute_length_rejected() {
        let b = basic_record(16, 5, "broken");
        let mut raw = b.finish();
        // Corrupt the first attribute's length to run past the record
        let first_attr = LittleEndian::read_u16(&raw[0x14..0x16]) as usize;
        raw[first_attr + 4..first_attr + 8].copy_from_slice(&0x4000u32.to_le_bytes());
        assert!(matches!(
            MftRecord::parse(&raw),
            Err(InspectorError::BadMftRecord(_))
        ));
    }

    #[test]
    fn test_device_bit_retained_but_not_visible() {
        let mut b = RecordBuilder::new(17, true, false);
        b.standard_info(0, 0, attr::ARCHIVE | attr::DEVICE);
        b.file_name(5, "dev");
        let record = MftRecord::parse(&b.finish()).unwrap();
        assert!(record.standard_info.dos_flags & attr::DEVICE != 0);
        assert!(record.visible_flags() & attr::DEVICE == 0);
        assert!(record.visible_flags() & attr::ARCHIVE != 0);
    }

    #[test]
    fn test_named_data_stream_ignored() {
        let mut b = basic_record(18, 5, "streams.txt");
        // A named DATA attribute (ADS) precedes the unnamed one
        let mut header_rest = [0u8; 16];
        header_rest[1] = 4; // name_length at 0x09
        header_rest[0x10 - 8..0x14 - 8].copy_from_slice(&3u32.to_le_bytes());
        header_rest[0x14 - 8..0x16 - 8].copy_from_slice(&0x18u16.to_le_bytes());
        b.push_attr(ATTR_DATA, &header_rest, b"ads");
        b.resident_data(b"primary");
        let record = MftRecord::parse(&b.finish()).unwrap();
        assert_eq!(record.data.size(), 7);
    }

    #[test]
    fn test_truncated_file_name_is_decode_error() {
        let mut b = RecordBuilder::new(20, true, false);
        b.standard_info(0, 0, 0);
        // FILE_NAME whose declared length runs past the attribute value
        let mut value = vec![0u8; 70];
        value[0..6].copy_from_slice(&5u64.to_le_bytes()[0..6]);
        value[64] = 40;
        let mut header_rest = [0u8; 16];
        header_rest[0x10 - 8..0x14 - 8].copy_from_slice(&(value.len() as u32).to_le_bytes());
        header_rest[0x14 - 8..0x16 - 8].copy_from_slice(&0x18u16.to_le_bytes());
        b.push_attr(ATTR_FILE_NAME, &header_rest, &value);
        assert!(matches!(
            MftRecord::parse(&b.finish()),
            Err(InspectorError::Decode(_))
        ));
    }

    #[test]
    fn test_hidden_system_not_active() {
        let mut b = RecordBuilder::new(19, true, false);
        b.standard_info(0, 0, attr::HIDDEN);
        b.file_name(5, "hidden.sys");
        let record = MftRecord::parse(&b.finish()).unwrap();
        assert!(!record.is_active());
    }
}
