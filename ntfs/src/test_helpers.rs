// Builders for on-disk fixtures shared across the test modules.

use crate::structures::*;

/// Bare $FILE_NAME value (the resident body), Win32 namespace, all four
/// timestamps set to `filetime`.
pub fn build_filename_value(name: &str, parent_reference: u64, filetime: u64) -> Vec<u8> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let mut value = vec![0u8; 0x42 + units.len() * 2];

    value[0..8].copy_from_slice(&parent_reference.to_le_bytes());
    for field in 0..4 {
        let off = 0x8 + field * 8;
        value[off..off + 8].copy_from_slice(&filetime.to_le_bytes());
    }
    value[0x28..0x30].copy_from_slice(&1024u64.to_le_bytes());
    value[0x30..0x38].copy_from_slice(&512u64.to_le_bytes());
    value[0x40] = units.len() as u8;
    value[0x41] = FILE_NAME_WIN32;
    for (i, unit) in units.iter().enumerate() {
        value[0x42 + i * 2..0x44 + i * 2].copy_from_slice(&unit.to_le_bytes());
    }
    value
}

/// Resident $FILE_NAME attribute record holding `name`.
pub fn build_filename_attribute(name: &str, parent_reference: u64, filetime: u64) -> Vec<u8> {
    let value = build_filename_value(name, parent_reference, filetime);
    let value_offset = 0x18usize;
    let declared = value_offset + value.len();
    let mut data = vec![0u8; (declared + 7) & !7];

    data[0..4].copy_from_slice(&ATTR_TYPE_FILE_NAME.to_le_bytes());
    data[4..8].copy_from_slice(&(declared as u32).to_le_bytes());
    data[8] = 0; // resident
    data[0x10..0x14].copy_from_slice(&(value.len() as u32).to_le_bytes());
    data[0x14..0x16].copy_from_slice(&(value_offset as u16).to_le_bytes());
    data[value_offset..value_offset + value.len()].copy_from_slice(&value);
    data
}

/// Minimal valid record block: no fixups, attribute list at 0x38. Returns
/// the block and the attribute-list cursor.
pub fn build_record(record_number: u64, sequence: u16, flags: u16) -> (Vec<u8>, usize) {
    let mut data = vec![0u8; MFT_RECORD_SIZE];
    data[0..4].copy_from_slice(&MFT_RECORD_MAGIC.to_le_bytes());
    data[0x4..0x6].copy_from_slice(&0x30u16.to_le_bytes()); // usa_offset
    data[0x6..0x8].copy_from_slice(&0u16.to_le_bytes()); // usa_count: none
    data[0x10..0x12].copy_from_slice(&sequence.to_le_bytes());
    data[0x12..0x14].copy_from_slice(&1u16.to_le_bytes()); // link count
    data[0x14..0x16].copy_from_slice(&0x38u16.to_le_bytes()); // attrs_offset
    data[0x16..0x18].copy_from_slice(&flags.to_le_bytes());
    data[0x18..0x1C].copy_from_slice(&0x40u32.to_le_bytes()); // bytes_in_use
    data[0x1C..0x20].copy_from_slice(&(MFT_RECORD_SIZE as u32).to_le_bytes());
    data[0x2C..0x30].copy_from_slice(&(record_number as u32).to_le_bytes());
    // empty attribute list
    data[0x38..0x3C].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
    (data, 0x38)
}

/// Append one attribute to a record under construction and move
/// bytes_in_use past it and the closing sentinel.
pub fn push_attribute(record: &mut [u8], cursor: &mut usize, attribute: &[u8]) {
    record[*cursor..*cursor + attribute.len()].copy_from_slice(attribute);
    *cursor += attribute.len();
    record[*cursor..*cursor + 4].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
    let in_use = (*cursor + 8) as u32;
    record[0x18..0x1C].copy_from_slice(&in_use.to_le_bytes());
}

/// Record with one Win32 $FILE_NAME attribute.
pub fn record_with_filename(
    record_number: u64,
    sequence: u16,
    flags: u16,
    name: &str,
    parent_reference: u64,
    filetime: u64,
) -> Vec<u8> {
    let (mut data, mut cursor) = build_record(record_number, sequence, flags);
    let attr = build_filename_attribute(name, parent_reference, filetime);
    push_attribute(&mut data, &mut cursor, &attr);
    data
}

/// Directory index entry (MFT variant) with an embedded filename view.
/// `declared_length` is written as the entry's length field; pass 0 to use
/// the natural 8-aligned size.
pub fn build_mft_index_entry(
    name: &str,
    mft_reference: u64,
    filetime: u64,
    declared_length: u16,
    flags: u32,
) -> Vec<u8> {
    let value = build_filename_value(name, 5, filetime);
    let natural = (0x10 + value.len() + 7) & !7;
    let length = if declared_length == 0 {
        natural as u16
    } else {
        declared_length
    };

    let mut entry = vec![0u8; (length as usize).max(natural)];
    entry[0..8].copy_from_slice(&mft_reference.to_le_bytes());
    entry[0x8..0xA].copy_from_slice(&length.to_le_bytes());
    entry[0xA..0xC].copy_from_slice(&(value.len() as u16).to_le_bytes());
    entry[0xC..0x10].copy_from_slice(&flags.to_le_bytes());
    entry[0x10..0x10 + value.len()].copy_from_slice(&value);
    entry
}
