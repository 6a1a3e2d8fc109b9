// Source selection and tuning options shared by the parser and the CLI.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Bytes per cluster assumed for volume images unless configured otherwise.
pub const DEFAULT_CLUSTER_SIZE: u32 = 4096;

/// Shape of the input handed to the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// A raw $MFT file: consecutive 1024-byte records starting at offset 0.
    Mft,
    /// A full NTFS volume image.
    Image,
    /// An isolated INDX record.
    Indx,
}

/// Timestamp window used to score recovered slack entries. Entries whose
/// four timestamps do not all fall strictly inside the window are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub min: DateTime<Utc>,
    pub max: DateTime<Utc>,
}

impl Default for DateWindow {
    fn default() -> Self {
        Self {
            min: Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap(),
            max: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }
}

/// Configuration for one parsing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceOptions {
    /// Input shape.
    pub filetype: SourceType,
    /// Bytes per cluster, used when locating the MFT inside a volume image.
    pub cluster_size: u32,
    /// Byte offset of the NTFS partition inside the image.
    pub volume_offset: u64,
    /// String prepended to reconstructed paths. `None` renders as `\.`.
    pub path_prefix: Option<String>,
    /// Plausibility window for slack-entry timestamps.
    pub slack_window: DateWindow,
}

impl SourceOptions {
    pub fn new(filetype: SourceType) -> Self {
        Self {
            filetype,
            cluster_size: DEFAULT_CLUSTER_SIZE,
            volume_offset: 0,
            path_prefix: None,
            slack_window: DateWindow::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window() {
        let window = DateWindow::default();
        assert_eq!(window.min, Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(window.max, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert!(window.min < window.max);
    }

    #[test]
    fn test_default_options() {
        let options = SourceOptions::new(SourceType::Mft);
        assert_eq!(options.cluster_size, 4096);
        assert_eq!(options.volume_offset, 0);
        assert!(options.path_prefix.is_none());
    }
}
