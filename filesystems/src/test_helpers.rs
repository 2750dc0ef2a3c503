// Test helpers: synthetic FAT32 and NTFS images small enough to build
// in memory, exercised by the unit and integration tests.

/// FAT32 image pieces. Geometry: 512-byte sectors, 1 sector per
/// cluster, 32 reserved sectors, two 8-sector FATs, root at cluster 2.
pub mod fat32_image {
    pub const BYTES_PER_SECTOR: usize = 512;
    pub const SECTORS_PER_CLUSTER: usize = 1;
    pub const RESERVED_SECTORS: usize = 32;
    pub const NUM_FATS: usize = 2;
    pub const SECTORS_PER_FAT: usize = 8;
    pub const ROOT_CLUSTER: u32 = 2;
    pub const DATA_START_SECTOR: usize = RESERVED_SECTORS + NUM_FATS * SECTORS_PER_FAT;
    pub const TOTAL_SECTORS: usize = DATA_START_SECTOR + 64;

    pub const END_OF_CHAIN: u32 = 0x0FFF_FFFF;

    pub struct ImageBuilder {
        image: Vec<u8>,
    }

    impl ImageBuilder {
        pub fn new() -> Self {
            let mut image = vec![0u8; TOTAL_SECTORS * BYTES_PER_SECTOR];
            image[0x0B..0x0D].copy_from_slice(&(BYTES_PER_SECTOR as u16).to_le_bytes());
            image[0x0D] = SECTORS_PER_CLUSTER as u8;
            image[0x0E..0x10].copy_from_slice(&(RESERVED_SECTORS as u16).to_le_bytes());
            image[0x10] = NUM_FATS as u8;
            image[0x20..0x24].copy_from_slice(&(TOTAL_SECTORS as u32).to_le_bytes());
            image[0x24..0x28].copy_from_slice(&(SECTORS_PER_FAT as u32).to_le_bytes());
            image[0x2C..0x30].copy_from_slice(&ROOT_CLUSTER.to_le_bytes());
            image[0x52..0x5A].copy_from_slice(b"FAT32   ");

            let mut builder = ImageBuilder { image };
            builder.set_fat(0, 0x0FFF_FFF8);
            builder.set_fat(1, END_OF_CHAIN);
            builder
        }

        /// Write a FAT entry into every FAT copy.
        pub fn set_fat(&mut self, cluster: u32, value: u32) {
            for copy in 0..NUM_FATS {
                let offset = (RESERVED_SECTORS + copy * SECTORS_PER_FAT) * BYTES_PER_SECTOR
                    + cluster as usize * 4;
                self.image[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
            }
        }

        pub fn write_cluster(&mut self, cluster: u32, data: &[u8]) {
            let cluster_bytes = BYTES_PER_SECTOR * SECTORS_PER_CLUSTER;
            assert!(data.len() <= cluster_bytes);
            let offset =
                (DATA_START_SECTOR + (cluster as usize - 2) * SECTORS_PER_CLUSTER)
                    * BYTES_PER_SECTOR;
            self.image[offset..offset + data.len()].copy_from_slice(data);
        }

        pub fn build(self) -> Vec<u8> {
            self.image
        }
    }

    impl Default for ImageBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    /// A 32-byte short entry with fixed 2023-03-01 12:00:00 stamps.
    pub fn short_entry(name83: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
        let mut raw = [0u8; 32];
        raw[0..11].copy_from_slice(name83);
        raw[0x0B] = attr;
        raw[0x0E..0x10].copy_from_slice(&0x6000u16.to_le_bytes());
        raw[0x10..0x12].copy_from_slice(&0x5661u16.to_le_bytes());
        raw[0x12..0x14].copy_from_slice(&0x5661u16.to_le_bytes());
        raw[0x14..0x16].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
        raw[0x16..0x18].copy_from_slice(&0x6000u16.to_le_bytes());
        raw[0x18..0x1A].copy_from_slice(&0x5661u16.to_le_bytes());
        raw[0x1A..0x1C].copy_from_slice(&((cluster & 0xFFFF) as u16).to_le_bytes());
        raw[0x1C..0x20].copy_from_slice(&size.to_le_bytes());
        raw
    }

    /// LFN subentries for a long name, in physical (ordinal-descending)
    /// order, ready to precede the short entry.
    pub fn lfn_entries(long_name: &str) -> Vec<[u8; 32]> {
        let units: Vec<u16> = long_name.encode_utf16().collect();
        let pieces = (units.len() + 12) / 13;
        let mut entries = Vec::with_capacity(pieces);
        for ordinal in (1..=pieces).rev() {
            let mut raw = [0u8; 32];
            raw[0] = ordinal as u8 | if ordinal == pieces { 0x40 } else { 0 };
            raw[0x0B] = 0x0F;
            let chunk = &units[(ordinal - 1) * 13..(ordinal * 13).min(units.len())];
            let slots: Vec<usize> = (0x01..0x0B)
                .step_by(2)
                .chain((0x0E..0x1A).step_by(2))
                .chain((0x1C..0x20).step_by(2))
                .collect();
            for (i, &slot) in slots.iter().enumerate() {
                let unit = match i.cmp(&chunk.len()) {
                    std::cmp::Ordering::Less => chunk[i],
                    std::cmp::Ordering::Equal => 0x0000,
                    std::cmp::Ordering::Greater => 0xFFFF,
                };
                raw[slot..slot + 2].copy_from_slice(&unit.to_le_bytes());
            }
            entries.push(raw);
        }
        entries
    }

    pub fn dir_data(entries: &[[u8; 32]]) -> Vec<u8> {
        entries.concat()
    }
}

/// NTFS image pieces. Geometry: 512-byte sectors and clusters, the MFT
/// at cluster 8, 1024-byte FILE records (two clusters each).
pub mod ntfs_image {
    pub const BYTES_PER_SECTOR: usize = 512;
    pub const SECTORS_PER_CLUSTER: usize = 1;
    pub const MFT_LCN: u64 = 8;
    pub const MFT_MIRROR_LCN: u64 = 2;
    pub const RECORD_SIZE: usize = 1024;
    pub const TOTAL_SECTORS: usize = 200;

    const FIRST_ATTR: usize = 0x38;

    /// Builds one FILE record: header, then attributes in call order,
    /// then the end marker.
    pub struct RecordBuilder {
        raw: Vec<u8>,
        pos: usize,
    }

    impl RecordBuilder {
        pub fn new(file_id: u32, in_use: bool, directory: bool) -> Self {
            let mut raw = vec![0u8; RECORD_SIZE];
            raw[0..4].copy_from_slice(b"FILE");
            raw[0x14..0x16].copy_from_slice(&(FIRST_ATTR as u16).to_le_bytes());
            let mut flags = 0u8;
            if in_use {
                flags |= 0x01;
            }
            if directory {
                flags |= 0x02;
            }
            raw[0x16] = flags;
            raw[0x2C..0x30].copy_from_slice(&file_id.to_le_bytes());
            RecordBuilder {
                raw,
                pos: FIRST_ATTR,
            }
        }

        /// Append a raw attribute; `header_rest` is bytes 0x08.. of the
        /// header, the value follows immediately.
        pub fn push_attr(&mut self, attr_type: u32, header_rest: &[u8], value: &[u8]) {
            let value_offset = 8 + header_rest.len();
            let length = (value_offset + value.len() + 7) & !7;
            let p = self.pos;
            self.raw[p..p + 4].copy_from_slice(&attr_type.to_le_bytes());
            self.raw[p + 4..p + 8].copy_from_slice(&(length as u32).to_le_bytes());
            self.raw[p + 8..p + value_offset].copy_from_slice(header_rest);
            self.raw[p + value_offset..p + value_offset + value.len()].copy_from_slice(value);
            self.pos += length;
        }

        pub fn standard_info(&mut self, created: u64, modified: u64, dos_flags: u32) {
            let mut header_rest = [0u8; 16];
            header_rest[0x10 - 8..0x14 - 8].copy_from_slice(&48u32.to_le_bytes());
            header_rest[0x14 - 8..0x16 - 8].copy_from_slice(&0x18u16.to_le_bytes());
            let mut value = [0u8; 48];
            value[0..8].copy_from_slice(&created.to_le_bytes());
            value[8..16].copy_from_slice(&modified.to_le_bytes());
            value[32..36].copy_from_slice(&dos_flags.to_le_bytes());
            self.push_attr(0x10, &header_rest, &value);
        }

        pub fn file_name(&mut self, parent: u64, name: &str) {
            let units: Vec<u16> = name.encode_utf16().collect();
            let mut value = vec![0u8; 66 + units.len() * 2];
            value[0..6].copy_from_slice(&parent.to_le_bytes()[0..6]);
            value[64] = units.len() as u8;
            for (i, u) in units.iter().enumerate() {
                value[66 + i * 2..68 + i * 2].copy_from_slice(&u.to_le_bytes());
            }
            let mut header_rest = [0u8; 16];
            header_rest[0x10 - 8..0x14 - 8]
                .copy_from_slice(&(value.len() as u32).to_le_bytes());
            header_rest[0x14 - 8..0x16 - 8].copy_from_slice(&0x18u16.to_le_bytes());
            self.push_attr(0x30, &header_rest, &value);
        }

        pub fn resident_data(&mut self, content: &[u8]) {
            let mut header_rest = [0u8; 16];
            header_rest[0x10 - 8..0x14 - 8]
                .copy_from_slice(&(content.len() as u32).to_le_bytes());
            header_rest[0x14 - 8..0x16 - 8].copy_from_slice(&0x18u16.to_le_bytes());
            self.push_attr(0x80, &header_rest, content);
        }

        /// Non-resident DATA: header runs through 0x40, runlist after.
        pub fn non_resident_data(&mut self, size: u64, runlist: &[u8]) {
            let mut header_rest = vec![0u8; 0x38];
            header_rest[0] = 1;
            header_rest[0x30 - 8..0x38 - 8].copy_from_slice(&size.to_le_bytes());
            self.push_attr(0x80, &header_rest, runlist);
        }

        pub fn index_root(&mut self) {
            self.push_attr(0x90, &[0u8; 16], &[0u8; 16]);
        }

        pub fn finish(mut self) -> Vec<u8> {
            let p = self.pos;
            self.raw[p..p + 4].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
            self.raw
        }
    }

    pub struct ImageBuilder {
        image: Vec<u8>,
    }

    impl ImageBuilder {
        /// `record_slots` counts MFT slots including slot 0 ($MFT). The
        /// $MFT record itself is written here with a single run covering
        /// exactly those slots.
        pub fn new(record_slots: usize, serial: u64) -> Self {
            let mut image = vec![0u8; TOTAL_SECTORS * BYTES_PER_SECTOR];
            image[0x03..0x0B].copy_from_slice(b"NTFS    ");
            image[0x0B..0x0D].copy_from_slice(&(BYTES_PER_SECTOR as u16).to_le_bytes());
            image[0x0D] = SECTORS_PER_CLUSTER as u8;
            image[0x28..0x30].copy_from_slice(&(TOTAL_SECTORS as u64).to_le_bytes());
            image[0x30..0x38].copy_from_slice(&MFT_LCN.to_le_bytes());
            image[0x38..0x40].copy_from_slice(&MFT_MIRROR_LCN.to_le_bytes());
            image[0x40] = (-10i8) as u8; // 2^10 = 1024-byte records
            image[0x48..0x50].copy_from_slice(&serial.to_le_bytes());

            let mut builder = ImageBuilder { image };

            let clusters_per_record = RECORD_SIZE / (BYTES_PER_SECTOR * SECTORS_PER_CLUSTER);
            let mft_clusters = (record_slots * clusters_per_record) as u8;
            let mut mft = RecordBuilder::new(0, true, false);
            mft.standard_info(0, 0, 0x06); // hidden | system
            mft.file_name(5, "$MFT");
            mft.non_resident_data(
                (record_slots * RECORD_SIZE) as u64,
                &[0x11, mft_clusters, MFT_LCN as u8, 0x00],
            );
            builder.put_record(0, &mft.finish());
            builder
        }

        pub fn put_record(&mut self, slot: usize, raw: &[u8]) {
            assert_eq!(raw.len(), RECORD_SIZE);
            let offset = MFT_LCN as usize * BYTES_PER_SECTOR * SECTORS_PER_CLUSTER
                + slot * RECORD_SIZE;
            self.image[offset..offset + RECORD_SIZE].copy_from_slice(raw);
        }

        pub fn write_cluster(&mut self, lcn: u64, data: &[u8]) {
            let cluster_bytes = BYTES_PER_SECTOR * SECTORS_PER_CLUSTER;
            assert!(data.len() <= cluster_bytes);
            let offset = lcn as usize * cluster_bytes;
            self.image[offset..offset + data.len()].copy_from_slice(data);
        }

        /// Write arbitrary bytes starting at a cluster, spanning as many
        /// clusters as needed.
        pub fn write_data(&mut self, lcn: u64, data: &[u8]) {
            let cluster_bytes = BYTES_PER_SECTOR * SECTORS_PER_CLUSTER;
            let offset = lcn as usize * cluster_bytes;
            self.image[offset..offset + data.len()].copy_from_slice(data);
        }

        pub fn build(self) -> Vec<u8> {
            self.image
        }
    }
}
