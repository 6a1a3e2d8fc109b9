// Update sequence array fixup for multi-sector records.
//
// Multi-sector records (MFT records, INDX allocation blocks) stamp the last
// word of every 512-byte sector with an update sequence number and keep the
// displaced words in an array at `usa_offset`. A torn write leaves a sector
// whose trailing word no longer matches the sentinel.

use log::{debug, warn};
use sift_core::SiftError;

use crate::buffer::read_word;
use crate::structures::SECTOR_SIZE;

/// Apply USA fixup in place. For each protected sector whose trailing word
/// matches the sentinel, the displaced word from the array is written back.
/// A mismatched sector is logged and left untouched. Idempotent for a given
/// record: a patched sector no longer matches the sentinel, so a second
/// pass leaves it alone.
pub fn apply_fixup(buf: &mut [u8], usa_offset: u16, usa_count: u16) -> Result<(), SiftError> {
    let usa_offset = usa_offset as usize;
    let fixup_value = read_word(buf, usa_offset)?;

    for i in 0..usa_count.saturating_sub(1) as usize {
        let sector_tail = SECTOR_SIZE * (i + 1) - 2;
        let check_value = read_word(buf, sector_tail)?;

        if check_value != fixup_value {
            warn!("Bad fixup at {:#x}", sector_tail);
            continue;
        }

        let replacement = read_word(buf, usa_offset + 2 + 2 * i)?;
        buf[sector_tail..sector_tail + 2].copy_from_slice(&replacement.to_le_bytes());
        debug!(
            "Fixup verified at {:#x} and patched from {:#x} to {:#x}",
            sector_tail, fixup_value, replacement
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_fixups() -> Vec<u8> {
        let mut data = vec![0u8; 1024];

        // USA at 0x30: sentinel 0xBEEF, replacements 0x1122 and 0x3344
        data[0x30..0x32].copy_from_slice(&0xBEEFu16.to_le_bytes());
        data[0x32..0x34].copy_from_slice(&0x1122u16.to_le_bytes());
        data[0x34..0x36].copy_from_slice(&0x3344u16.to_le_bytes());

        // sector tails stamped with the sentinel
        data[0x1FE..0x200].copy_from_slice(&0xBEEFu16.to_le_bytes());
        data[0x3FE..0x400].copy_from_slice(&0xBEEFu16.to_le_bytes());

        data
    }

    #[test]
    fn test_fixup_patches_sector_tails() {
        let mut data = record_with_fixups();
        apply_fixup(&mut data, 0x30, 3).unwrap();

        assert_eq!(&data[0x1FE..0x200], &[0x22, 0x11]);
        assert_eq!(&data[0x3FE..0x400], &[0x44, 0x33]);
    }

    #[test]
    fn test_fixup_is_idempotent() {
        let mut once = record_with_fixups();
        apply_fixup(&mut once, 0x30, 3).unwrap();

        let mut twice = once.clone();
        apply_fixup(&mut twice, 0x30, 3).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_fixup_mismatch_left_untouched() {
        let mut data = record_with_fixups();
        // corrupt the second sector's trailing word
        data[0x3FE..0x400].copy_from_slice(&0xDEADu16.to_le_bytes());

        apply_fixup(&mut data, 0x30, 3).unwrap();

        // first sector patched, second left as found
        assert_eq!(&data[0x1FE..0x200], &[0x22, 0x11]);
        assert_eq!(&data[0x3FE..0x400], &[0xAD, 0xDE]);
    }

    #[test]
    fn test_fixup_overrun() {
        let mut data = vec![0u8; 16];
        assert!(apply_fixup(&mut data, 0x30, 3).is_err());
    }

    #[test]
    fn test_fixup_zero_count() {
        let mut data = vec![0u8; 1024];
        let before = data.clone();
        apply_fixup(&mut data, 0x30, 0).unwrap();
        assert_eq!(data, before);
    }
}
