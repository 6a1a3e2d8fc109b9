// Attribute record decoders: the common header, the resident and
// non-resident variants, and the two resident values the traversal layer
// cares about ($STANDARD_INFORMATION and $FILE_NAME).
//
// Asking a resident attribute for non-resident fields, or the reverse, is
// a caller bug and surfaces as InvalidAttribute rather than a garbage read.

use log::debug;
use sift_core::{DateWindow, SiftError};

use crate::buffer::{read_binary, read_byte, read_dword, read_qword, read_word, read_wstring};
use crate::data_runs::Runlist;
use crate::structures::attribute_type_name;
use crate::timestamps::filetime_in_window;

/// View of one attribute record inside an MFT record buffer.
#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    buf: &'a [u8],
    offset: usize,
    pub attr_type: u32,
    declared_size: u32,
    pub non_resident: bool,
    pub name_length: u8,
    pub name_offset: u16,
    pub flags: u16,
    pub instance: u16,
}

impl<'a> Attribute<'a> {
    pub fn parse(buf: &'a [u8], offset: usize) -> Result<Self, SiftError> {
        let attr_type = read_dword(buf, offset)?;
        let declared_size = read_dword(buf, offset + 0x4)?;
        let non_resident = read_byte(buf, offset + 0x8)? > 0;
        let name_length = read_byte(buf, offset + 0x9)?;
        let name_offset = read_word(buf, offset + 0xA)?;
        let flags = read_word(buf, offset + 0xC)?;
        let instance = read_word(buf, offset + 0xE)?;

        debug!(
            "Attribute {} at {:#x}, {} bytes",
            attribute_type_name(attr_type),
            offset,
            declared_size
        );

        Ok(Self {
            buf,
            offset,
            attr_type,
            declared_size,
            non_resident,
            name_length,
            name_offset,
            flags,
            instance,
        })
    }

    /// Offset of this attribute within its record buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Attribute record size, rounded up to the 8-byte alignment the
    /// on-disk format keeps between consecutive attributes.
    pub fn size(&self) -> usize {
        (self.declared_size as usize + 7) & !7
    }

    /// Attribute name; empty for the unnamed default stream.
    pub fn name(&self) -> Result<String, SiftError> {
        read_wstring(
            self.buf,
            self.offset + self.name_offset as usize,
            self.name_length as usize,
        )
    }

    fn require_resident(&self) -> Result<(), SiftError> {
        if self.non_resident {
            return Err(SiftError::InvalidAttribute(format!(
                "{} is non-resident",
                attribute_type_name(self.attr_type)
            )));
        }
        Ok(())
    }

    fn require_non_resident(&self) -> Result<(), SiftError> {
        if !self.non_resident {
            return Err(SiftError::InvalidAttribute(format!(
                "{} is resident",
                attribute_type_name(self.attr_type)
            )));
        }
        Ok(())
    }

    pub fn value_length(&self) -> Result<u32, SiftError> {
        self.require_resident()?;
        read_dword(self.buf, self.offset + 0x10)
    }

    pub fn value_offset(&self) -> Result<u16, SiftError> {
        self.require_resident()?;
        read_word(self.buf, self.offset + 0x14)
    }

    pub fn value_flags(&self) -> Result<u8, SiftError> {
        self.require_resident()?;
        read_byte(self.buf, self.offset + 0x16)
    }

    /// Resident value body: a byte range inside the record buffer.
    pub fn value(&self) -> Result<&'a [u8], SiftError> {
        let len = self.value_length()? as usize;
        let off = self.value_offset()? as usize;
        read_binary(self.buf, self.offset + off, len)
    }

    pub fn lowest_vcn(&self) -> Result<u64, SiftError> {
        self.require_non_resident()?;
        read_qword(self.buf, self.offset + 0x10)
    }

    pub fn highest_vcn(&self) -> Result<u64, SiftError> {
        self.require_non_resident()?;
        read_qword(self.buf, self.offset + 0x18)
    }

    pub fn runlist_offset(&self) -> Result<u16, SiftError> {
        self.require_non_resident()?;
        read_word(self.buf, self.offset + 0x20)
    }

    pub fn compression_unit(&self) -> Result<u8, SiftError> {
        self.require_non_resident()?;
        read_byte(self.buf, self.offset + 0x22)
    }

    pub fn allocated_size(&self) -> Result<u64, SiftError> {
        self.require_non_resident()?;
        read_qword(self.buf, self.offset + 0x28)
    }

    pub fn data_size(&self) -> Result<u64, SiftError> {
        self.require_non_resident()?;
        read_qword(self.buf, self.offset + 0x30)
    }

    pub fn initialized_size(&self) -> Result<u64, SiftError> {
        self.require_non_resident()?;
        read_qword(self.buf, self.offset + 0x38)
    }

    pub fn compressed_size(&self) -> Result<u64, SiftError> {
        self.require_non_resident()?;
        read_qword(self.buf, self.offset + 0x40)
    }

    /// Runlist of a non-resident attribute.
    pub fn runlist(&self) -> Result<Runlist<'a>, SiftError> {
        let off = self.runlist_offset()? as usize;
        Ok(Runlist::new(self.buf, self.offset + off))
    }
}

/// View of a $STANDARD_INFORMATION value. The four timestamps and the DOS
/// attribute flags are always present; the post-Win2k fields may be absent
/// on short records and fail with a distinct error when requested.
#[derive(Debug, Clone)]
pub struct StandardInformation<'a> {
    buf: &'a [u8],
    offset: usize,
    pub created_time: u64,
    pub modified_time: u64,
    pub changed_time: u64,
    pub accessed_time: u64,
    pub attributes: u32,
}

impl<'a> StandardInformation<'a> {
    pub fn parse(buf: &'a [u8], offset: usize) -> Result<Self, SiftError> {
        debug!("Standard Information attribute at {:#x}", offset);
        let created_time = read_qword(buf, offset)?;
        let modified_time = read_qword(buf, offset + 0x8)?;
        let changed_time = read_qword(buf, offset + 0x10)?;
        let accessed_time = read_qword(buf, offset + 0x18)?;
        let attributes = read_dword(buf, offset + 0x20)?;
        // reserved bytes through 0x30 belong to the pre-Win2k layout
        read_binary(buf, offset + 0x24, 0xC)?;

        Ok(Self {
            buf,
            offset,
            created_time,
            modified_time,
            changed_time,
            accessed_time,
            attributes,
        })
    }

    pub fn owner_id(&self) -> Result<u32, SiftError> {
        read_dword(self.buf, self.offset + 0x30)
            .map_err(|_| SiftError::StandardInformationFieldDoesNotExist("Owner ID"))
    }

    pub fn security_id(&self) -> Result<u32, SiftError> {
        read_dword(self.buf, self.offset + 0x34)
            .map_err(|_| SiftError::StandardInformationFieldDoesNotExist("Security ID"))
    }

    pub fn quota_charged(&self) -> Result<u64, SiftError> {
        read_qword(self.buf, self.offset + 0x38)
            .map_err(|_| SiftError::StandardInformationFieldDoesNotExist("Quota Charged"))
    }

    pub fn usn(&self) -> Result<u64, SiftError> {
        read_qword(self.buf, self.offset + 0x40)
            .map_err(|_| SiftError::StandardInformationFieldDoesNotExist("USN"))
    }
}

/// View of a $FILE_NAME value: parent reference, four timestamps, sizes,
/// flags, then the UTF-16 name. Total size is 0x42 + 2 * filename_length.
#[derive(Debug, Clone)]
pub struct FilenameAttribute<'a> {
    pub parent_reference: u64,
    pub created_time: u64,
    pub modified_time: u64,
    pub changed_time: u64,
    pub accessed_time: u64,
    pub physical_size: u64,
    pub logical_size: u64,
    pub flags: u32,
    pub reparse_value: u32,
    pub filename_length: u8,
    pub filename_type: u8,
    name_raw: &'a [u8],
}

impl<'a> FilenameAttribute<'a> {
    pub fn parse(buf: &'a [u8], offset: usize) -> Result<Self, SiftError> {
        debug!("Filename attribute at {:#x}", offset);
        let parent_reference = read_qword(buf, offset)?;
        let created_time = read_qword(buf, offset + 0x8)?;
        let modified_time = read_qword(buf, offset + 0x10)?;
        let changed_time = read_qword(buf, offset + 0x18)?;
        let accessed_time = read_qword(buf, offset + 0x20)?;
        let physical_size = read_qword(buf, offset + 0x28)?;
        let logical_size = read_qword(buf, offset + 0x30)?;
        let flags = read_dword(buf, offset + 0x38)?;
        let reparse_value = read_dword(buf, offset + 0x3C)?;
        let filename_length = read_byte(buf, offset + 0x40)?;
        let filename_type = read_byte(buf, offset + 0x41)?;
        let name_raw = read_binary(buf, offset + 0x42, filename_length as usize * 2)?;

        Ok(Self {
            parent_reference,
            created_time,
            modified_time,
            changed_time,
            accessed_time,
            physical_size,
            logical_size,
            flags,
            reparse_value,
            filename_length,
            filename_type,
            name_raw,
        })
    }

    /// Total size of the view, name included.
    pub fn size(&self) -> usize {
        0x42 + 2 * self.filename_length as usize
    }

    /// Decode the UTF-16LE name.
    pub fn filename(&self) -> Result<String, SiftError> {
        let units: Vec<u16> = self
            .name_raw
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16(&units)
            .map_err(|_| SiftError::Parse("Invalid UTF-16 filename".to_string()))
    }

    /// True when all four timestamps fall strictly inside `window`.
    pub fn timestamps_within(&self, window: &DateWindow) -> bool {
        filetime_in_window(self.created_time, window)
            && filetime_in_window(self.modified_time, window)
            && filetime_in_window(self.changed_time, window)
            && filetime_in_window(self.accessed_time, window)
    }
}
