pub mod boot_sector;
pub mod fat32;
pub mod ntfs;
pub mod path;
pub mod test_helpers;
pub mod volume;

pub use boot_sector::FilesystemKind;
pub use strata_core::{attribute_names, BlockReader, EntryInfo, FsTimestamp, InspectorError, VolumeReport};
pub use volume::Volume;
