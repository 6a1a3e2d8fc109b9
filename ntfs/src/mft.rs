// MFT record decoder.
//
// A record is a fixed 1024-byte block starting with the "FILE" magic. The
// attribute list begins at attrs_offset and ends at the first 0 or
// 0xFFFFFFFF sentinel, or when an attribute's declared size would pass
// bytes_in_use. Parsing applies USA fixup, so the record owns its block;
// callers that need the pre-fixup bytes keep their own copy.

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use sift_core::SiftError;

use crate::attributes::{Attribute, FilenameAttribute, StandardInformation};
use crate::buffer::{read_binary, read_dword, read_word};
use crate::fixup::apply_fixup;
use crate::structures::*;

/// Size of the fixed MFT record header.
const MFT_RECORD_HEADER_SIZE: usize = 0x30;

/// One MFT record, owning its fixed-up block.
#[derive(Debug, Clone)]
pub struct MftRecord {
    data: Vec<u8>,
    inode: u64,
}

impl MftRecord {
    /// Parse a record from an owned block, applying USA fixup in place.
    /// The magic is not checked here; callers that only want `FILE`
    /// records filter on [`MftRecord::magic`].
    pub fn parse(mut data: Vec<u8>, inode: u64) -> Result<Self, SiftError> {
        let usa_offset = read_word(&data, 0x4)?;
        let usa_count = read_word(&data, 0x6)?;
        apply_fixup(&mut data, usa_offset, usa_count)?;
        read_binary(&data, 0, MFT_RECORD_HEADER_SIZE)?;

        debug!("MFT record {} parsed", inode);
        Ok(Self { data, inode })
    }

    /// Copy one 1024-byte block out of a larger buffer and parse the copy.
    /// Fixup happens on the copy; the backing buffer is left untouched.
    pub fn parse_from(buf: &[u8], offset: usize, inode: u64) -> Result<Self, SiftError> {
        let block = read_binary(buf, offset, MFT_RECORD_SIZE)?.to_vec();
        Self::parse(block, inode)
    }

    /// Position of this record in its source stream.
    pub fn inode(&self) -> u64 {
        self.inode
    }

    /// The fixed-up record block.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn magic(&self) -> u32 {
        LittleEndian::read_u32(&self.data[0x0..])
    }

    pub fn usa_offset(&self) -> u16 {
        LittleEndian::read_u16(&self.data[0x4..])
    }

    pub fn usa_count(&self) -> u16 {
        LittleEndian::read_u16(&self.data[0x6..])
    }

    pub fn lsn(&self) -> u64 {
        LittleEndian::read_u64(&self.data[0x8..])
    }

    pub fn sequence_number(&self) -> u16 {
        LittleEndian::read_u16(&self.data[0x10..])
    }

    pub fn link_count(&self) -> u16 {
        LittleEndian::read_u16(&self.data[0x12..])
    }

    pub fn attrs_offset(&self) -> u16 {
        LittleEndian::read_u16(&self.data[0x14..])
    }

    pub fn flags(&self) -> u16 {
        LittleEndian::read_u16(&self.data[0x16..])
    }

    pub fn bytes_in_use(&self) -> u32 {
        LittleEndian::read_u32(&self.data[0x18..])
    }

    pub fn bytes_allocated(&self) -> u32 {
        LittleEndian::read_u32(&self.data[0x1C..])
    }

    pub fn base_record_reference(&self) -> u64 {
        LittleEndian::read_u64(&self.data[0x20..])
    }

    pub fn next_attr_instance(&self) -> u16 {
        LittleEndian::read_u16(&self.data[0x28..])
    }

    pub fn record_number(&self) -> u64 {
        LittleEndian::read_u32(&self.data[0x2C..]) as u64 & 0xFFFF_FFFF_FFFF
    }

    pub fn is_directory(&self) -> bool {
        self.flags() & MFT_RECORD_IS_DIRECTORY != 0
    }

    pub fn is_active(&self) -> bool {
        self.flags() & MFT_RECORD_IN_USE != 0
    }

    /// Iterate attribute records.
    pub fn attributes(&self) -> Attributes<'_> {
        Attributes {
            record: self,
            offset: self.attrs_offset() as usize,
        }
    }

    /// First attribute of the given type.
    pub fn attribute(&self, attr_type: u32) -> Option<Attribute<'_>> {
        self.attributes().find(|a| a.attr_type == attr_type)
    }

    /// First $FILE_NAME attribute, preferring the Win32 namespace. A record
    /// may carry several (8.3, POSIX, Win32); a malformed one must not mask
    /// a later valid one, so individual parse failures are swallowed. When
    /// no Win32 name exists, the last parsed view wins.
    pub fn filename_information(&self) -> Option<FilenameAttribute<'_>> {
        let mut fallback = None;
        for attr in self.attributes() {
            if attr.attr_type != ATTR_TYPE_FILE_NAME {
                continue;
            }
            let value = match attr.value() {
                Ok(value) => value,
                Err(_) => continue,
            };
            match FilenameAttribute::parse(value, 0) {
                Ok(fn_attr) => {
                    if fn_attr.filename_type == FILE_NAME_WIN32
                        || fn_attr.filename_type == FILE_NAME_WIN32_AND_DOS
                    {
                        return Some(fn_attr);
                    }
                    fallback = Some(fn_attr);
                }
                Err(e) => {
                    debug!("Skipping malformed $FILE_NAME attribute: {}", e);
                }
            }
        }
        fallback
    }

    /// The $STANDARD_INFORMATION view. `Ok(None)` means the attribute is
    /// not present, which is distinct from a parse failure.
    pub fn standard_information(&self) -> Result<Option<StandardInformation<'_>>, SiftError> {
        let attr = match self.attribute(ATTR_TYPE_STANDARD_INFORMATION) {
            Some(attr) => attr,
            None => return Ok(None),
        };
        let value = attr.value()?;
        Ok(Some(StandardInformation::parse(value, 0)?))
    }

    /// First unnamed $DATA attribute (the default stream).
    pub fn data_attribute(&self) -> Option<Attribute<'_>> {
        self.attributes().find(|a| {
            a.attr_type == ATTR_TYPE_DATA && a.name().map(|n| n.is_empty()).unwrap_or(false)
        })
    }
}

/// Lazy, single-pass iterator over a record's attributes.
pub struct Attributes<'a> {
    record: &'a MftRecord,
    offset: usize,
}

impl<'a> Iterator for Attributes<'a> {
    type Item = Attribute<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let type_code = read_dword(&self.record.data, self.offset).ok()?;
        if type_code == 0 || type_code == 0xFFFF_FFFF {
            return None;
        }

        let declared = read_dword(&self.record.data, self.offset + 4).ok()? as usize;
        if self.offset + declared > self.record.bytes_in_use() as usize {
            return None;
        }

        let attr = Attribute::parse(&self.record.data, self.offset).ok()?;
        if attr.size() == 0 {
            return None;
        }
        self.offset += attr.size();
        Some(attr)
    }
}
