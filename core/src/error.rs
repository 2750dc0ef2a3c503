use thiserror::Error;

#[derive(Debug, Error)]
pub enum InspectorError {
    #[error("Short read at offset {offset}: wanted {wanted} bytes, got {got}")]
    IoShort { offset: u64, wanted: usize, got: usize },

    #[error("Read past end of volume: offset {offset} + {len} exceeds size {size}")]
    IoRange { offset: u64, len: u64, size: u64 },

    #[error("No FAT32 or NTFS signature in boot sector")]
    UnknownFilesystem,

    #[error("Bad boot sector: {0}")]
    BadBootSector(String),

    #[error("Corrupt cluster chain: {0}")]
    CorruptChain(String),

    #[error("Cluster out of range: {0}")]
    ClusterOutOfRange(u32),

    #[error("Bad directory entry: {0}")]
    BadDirectoryEntry(String),

    #[error("Bad MFT record: {0}")]
    BadMftRecord(String),

    #[error("MFT record has no FILE_NAME attribute")]
    NoName,

    #[error("MFT record is not in use")]
    Deleted,

    #[error("Directory tree has no root record")]
    NoRoot,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("'{0}' is a directory")]
    IsDirectory(String),

    #[error("'{0}' is not a directory")]
    NotADirectory(String),

    #[error("'{0}' is fragmented beyond the decoded runs")]
    FragmentedUnsupported(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
