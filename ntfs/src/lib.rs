// NTFS Master File Table and directory-index (INDX) parsing.
// Read-only: structures are decoded from byte buffers and never written
// back, except for the in-place USA fixup on owned record blocks.

pub mod attributes;
pub mod buffer;
pub mod data_runs;
pub mod fixup;
pub mod index;
pub mod mft;
pub mod path_resolver;
pub mod reader;
pub mod structures;
pub mod timestamps;

#[cfg(test)]
pub mod test_helpers;

// Re-export the main types
pub use attributes::{Attribute, FilenameAttribute, StandardInformation};
pub use data_runs::{DataRun, Runlist};
pub use index::{
    IndexNodeHeader, IndexRecord, IndexRootHeader, MftIndexEntry, SdhIndexEntry, SiiIndexEntry,
};
pub use mft::MftRecord;
pub use path_resolver::PathResolver;
pub use reader::NtfsSource;
