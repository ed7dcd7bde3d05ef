/// On-disk file header: a self-describing, checksummed container
/// that records the queue's capacity, slot size, schema identity, and
/// physical length.
///
/// ```text
/// offset size  field
///  0     8     magic            = 00 4D 4D 51 46 03 1A 0A
///  8     1     version          = 0x00
///  9     4     header_crc       (CRC-32/IEEE over bytes 13..=38)
/// 13     8     length           (total file size in bytes)
/// 21     8     schema_id
/// 29     4     capacity
/// 33     4     slot_size
/// 37     2     data_offset      = 39
/// ```
use crate::codec;
use crate::error::{Error, Result};

/// Fixed magic tag identifying an mmqf file.
pub const MAGIC: [u8; 8] = [0x00, 0x4D, 0x4D, 0x51, 0x46, 0x03, 0x1A, 0x0A];

/// Current on-disk format version.
pub const CURRENT_VERSION: u8 = 0;

/// Minimum version this build will open.
pub const MIN_SUPPORTED_VERSION: u8 = 0;

/// Fixed header size for version 0.
pub const HEADER_SIZE: u16 = 39;

/// Size of the control block that opens the data region.
pub const CONTROL_BLOCK_SIZE: u64 = 32;

const OFFSET_MAGIC: usize = 0;
const OFFSET_VERSION: usize = 8;
const OFFSET_CRC: usize = 9;
const OFFSET_LENGTH: usize = 13;
const OFFSET_SCHEMA_ID: usize = 21;
const OFFSET_CAPACITY: usize = 29;
const OFFSET_SLOT_SIZE: usize = 33;
const OFFSET_DATA_OFFSET: usize = 37;

/// Parsed, validated file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub length: u64,
    pub schema_id: u64,
    pub capacity: u32,
    pub slot_size: u32,
    pub data_offset: u16,
}

impl Header {
    /// Build the header for a freshly created file with the given geometry.
    pub fn new(schema_id: u64, capacity: u32, slot_size: u32) -> Self {
        let data_offset = HEADER_SIZE;
        let length = data_offset as u64 + Self::data_region_len(capacity, slot_size);
        Self {
            version: CURRENT_VERSION,
            length,
            schema_id,
            capacity,
            slot_size,
            data_offset,
        }
    }

    /// Size in bytes of the control block plus all slots.
    pub fn data_region_len(capacity: u32, slot_size: u32) -> u64 {
        slot_size as u64 * capacity as u64 + CONTROL_BLOCK_SIZE
    }

    /// Serialise this header to its fixed 39-byte on-disk representation.
    pub fn encode(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[OFFSET_MAGIC..OFFSET_MAGIC + 8].copy_from_slice(&MAGIC);
        buf[OFFSET_VERSION] = self.version;

        // Geometry fields are written first so the CRC can cover them in one pass.
        codec::write_u64(&mut buf, OFFSET_LENGTH, self.length).unwrap();
        codec::write_u64(&mut buf, OFFSET_SCHEMA_ID, self.schema_id).unwrap();
        codec::write_u32(&mut buf, OFFSET_CAPACITY, self.capacity).unwrap();
        codec::write_u32(&mut buf, OFFSET_SLOT_SIZE, self.slot_size).unwrap();
        codec::write_u16(&mut buf, OFFSET_DATA_OFFSET, self.data_offset).unwrap();

        let crc = crc32fast::hash(&buf[OFFSET_LENGTH..OFFSET_DATA_OFFSET + 2]);
        codec::write_u32(&mut buf, OFFSET_CRC, crc).unwrap();

        buf
    }

    /// Parse and validate a header from raw bytes: magic, version range, then CRC.
    ///
    /// Does not check the on-disk `length` against the actual file size; call
    /// [`Header::validate_length`] with the real file size for that.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE as usize {
            return Err(Error::InvalidFormat(format!(
                "header too short: {} bytes, need {}",
                data.len(),
                HEADER_SIZE
            )));
        }

        if data[OFFSET_MAGIC..OFFSET_MAGIC + 8] != MAGIC {
            return Err(Error::InvalidFormat("magic mismatch".to_string()));
        }

        let version = data[OFFSET_VERSION];
        if version < MIN_SUPPORTED_VERSION || version > CURRENT_VERSION {
            return Err(Error::VersionUnsupported {
                found: version,
                min: MIN_SUPPORTED_VERSION,
                max: CURRENT_VERSION,
            });
        }

        // The CRC window is the fixed `[length .. data_offset)` span for this
        // version, not derived from the as-yet-unverified `data_offset`
        // field itself -- otherwise a corrupt `data_offset` could steer the
        // CRC check away from the very bytes that are supposed to catch it.
        let crc_window_end = OFFSET_DATA_OFFSET + 2;
        let expected_crc = codec::read_u32(data, OFFSET_CRC)?;
        let actual_crc = crc32fast::hash(&data[OFFSET_LENGTH..crc_window_end]);
        if expected_crc != actual_crc {
            return Err(Error::ChecksumMismatch);
        }

        let length = codec::read_u64(data, OFFSET_LENGTH)?;
        let schema_id = codec::read_u64(data, OFFSET_SCHEMA_ID)?;
        let capacity = codec::read_u32(data, OFFSET_CAPACITY)?;
        let slot_size = codec::read_u32(data, OFFSET_SLOT_SIZE)?;
        let data_offset = codec::read_u16(data, OFFSET_DATA_OFFSET)?;

        if (data_offset as usize) < crc_window_end || data.len() < data_offset as usize {
            return Err(Error::InvalidFormat(format!("impossible data_offset {}", data_offset)));
        }

        Ok(Self {
            version,
            length,
            schema_id,
            capacity,
            slot_size,
            data_offset,
        })
    }

    /// Compare the header's recorded `length` against the real file size.
    pub fn validate_length(&self, actual_len: u64) -> Result<()> {
        if self.length != actual_len {
            return Err(Error::FileTruncated {
                expected: self.length,
                actual: actual_len,
            });
        }
        Ok(())
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn data_offset(&self) -> u16 {
        self.data_offset
    }

    pub fn schema_id(&self) -> u64 {
        self.schema_id
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn slot_size(&self) -> u32 {
        self.slot_size
    }

    pub fn length(&self) -> u64 {
        self.length
    }
}
