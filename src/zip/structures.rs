use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::ExtractionError;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: [u8; 4] = *b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Central Directory File Header, marks the end of the entry stream
pub const CDFH_SIGNATURE: [u8; 4] = *b"PK\x01\x02";

/// End of Central Directory, the only record of an archive without entries
pub const EOCD_SIGNATURE: [u8; 4] = *b"PK\x05\x06";

/// Optional signature in front of a data descriptor
pub const DATA_DESCRIPTOR_SIGNATURE: [u8; 4] = *b"PK\x07\x08";

/// General purpose flag: entry is encrypted
pub const FLAG_ENCRYPTED: u16 = 0x0001;

/// General purpose flag: sizes and CRC follow the data in a descriptor
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Fixed part of a local file header, after the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    /// Bytes following the 4-byte signature.
    pub const FIXED_SIZE: usize = LFH_SIZE - 4;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ExtractionError> {
        if data.len() < Self::FIXED_SIZE {
            return Err(ExtractionError::InvalidArchive(
                "truncated local file header".to_string(),
            ));
        }

        let mut cursor = Cursor::new(data);

        Ok(Self {
            version_needed: cursor.read_u16::<LittleEndian>()?,
            flags: cursor.read_u16::<LittleEndian>()?,
            compression_method: CompressionMethod::from_u16(cursor.read_u16::<LittleEndian>()?),
            last_mod_time: cursor.read_u16::<LittleEndian>()?,
            last_mod_date: cursor.read_u16::<LittleEndian>()?,
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>()?,
            file_name_length: cursor.read_u16::<LittleEndian>()?,
            extra_field_length: cursor.read_u16::<LittleEndian>()?,
        })
    }

    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }
}

/// Sizes carried by the ZIP64 extended information extra field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Zip64Sizes {
    pub uncompressed_size: Option<u64>,
    pub compressed_size: Option<u64>,
}

/// Find the ZIP64 sizes in a local extra field.
///
/// In a local header both sizes are present whenever the field is, but only
/// the ones whose 32-bit counterpart is saturated are meaningful.
pub fn parse_zip64_extra(
    extra: &[u8],
    header: &LocalFileHeader,
) -> Result<Option<Zip64Sizes>, ExtractionError> {
    let mut cursor = Cursor::new(extra);
    let end = extra.len() as u64;

    while cursor.position() + 4 <= end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()? as u64;
        let field_end = (cursor.position() + field_size).min(end);

        if header_id == ZIP64_EXTRA_ID {
            let mut sizes = Zip64Sizes::default();
            if header.uncompressed_size == u32::MAX && cursor.position() + 8 <= field_end {
                sizes.uncompressed_size = Some(cursor.read_u64::<LittleEndian>()?);
            }
            if header.compressed_size == u32::MAX && cursor.position() + 8 <= field_end {
                sizes.compressed_size = Some(cursor.read_u64::<LittleEndian>()?);
            }
            return Ok(Some(sizes));
        }

        // Skip unknown extra fields
        cursor.set_position(field_end);
    }

    Ok(None)
}

/// Metadata of one archive entry as read from its local header.
///
/// The declared sizes come from the archive and are not trusted; they are
/// only reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Slash-separated relative path as stored in the archive
    pub name: String,
    pub is_directory: bool,
    pub method: CompressionMethod,
    pub flags: u16,
    pub crc32: u32,
    /// Unknown (`None`) when the sizes are deferred to a data descriptor
    pub compressed_size: Option<u64>,
    pub declared_size: Option<u64>,
    pub zip64: bool,
}

impl ArchiveEntry {
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }
}
