use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Buffer overrun: wanted {wanted} bytes at offset {offset:#x}, buffer holds {have}")]
    OverrunBuffer {
        offset: usize,
        wanted: usize,
        have: usize,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid attribute: {0}")]
    InvalidAttribute(String),

    #[error("Invalid MFT record number: {0}")]
    InvalidMftRecordNumber(u64),

    #[error("Standard Information attribute field does not exist: {0}")]
    StandardInformationFieldDoesNotExist(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
