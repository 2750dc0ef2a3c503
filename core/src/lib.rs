pub mod device;
pub mod error;
pub mod types;

pub use device::BlockReader;
pub use error::InspectorError;
pub use types::{attribute_names, EntryInfo, FsTimestamp, VolumeReport};
