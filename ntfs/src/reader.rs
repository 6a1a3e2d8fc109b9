// Input sources for record traversal: a raw $MFT file, a full NTFS volume
// image, or an isolated INDX record.
//
// Records are consecutive 1024-byte blocks. In image mode the MFT is
// located through the boot sector's MFT-cluster field. A fragmented MFT is
// not followed: records past the first fragment are under-read.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, warn};
use sift_core::{SiftError, SourceOptions, SourceType};

use crate::mft::MftRecord;
use crate::path_resolver::PathResolver;
use crate::structures::{MFT_RECORD_MAGIC, MFT_RECORD_SIZE};

/// Offset of the MFT starting-cluster field inside the NTFS boot sector.
const MFT_CLUSTER_FIELD_OFFSET: u64 = 0x30;

/// A seekable source of MFT records.
pub struct NtfsSource<R> {
    inner: R,
    options: SourceOptions,
    mft_offset: Option<u64>,
}

impl NtfsSource<File> {
    /// Open a file-backed source.
    pub fn open<P: AsRef<Path>>(path: P, options: SourceOptions) -> Result<Self, SiftError> {
        Ok(Self::new(File::open(path)?, options))
    }
}

impl<R: Read + Seek> NtfsSource<R> {
    pub fn new(inner: R, options: SourceOptions) -> Self {
        Self {
            inner,
            options,
            mft_offset: None,
        }
    }

    pub fn options(&self) -> &SourceOptions {
        &self.options
    }

    /// Locate the MFT inside a volume image: the boot sector stores the
    /// MFT's starting cluster as a QWORD at +0x30.
    fn mft_offset(&mut self) -> Result<u64, SiftError> {
        if let Some(offset) = self.mft_offset {
            return Ok(offset);
        }

        self.inner.seek(SeekFrom::Start(
            self.options.volume_offset + MFT_CLUSTER_FIELD_OFFSET,
        ))?;
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf)?;
        let relative_cluster = u64::from_le_bytes(buf);

        let offset =
            self.options.volume_offset + relative_cluster * self.options.cluster_size as u64;
        debug!("MFT offset is {:#x}", offset);
        self.mft_offset = Some(offset);
        Ok(offset)
    }

    fn record_base(&mut self, number: u64) -> Result<Option<u64>, SiftError> {
        match self.options.filetype {
            SourceType::Indx => Ok(None),
            SourceType::Mft => Ok(Some(number * MFT_RECORD_SIZE as u64)),
            SourceType::Image => Ok(Some(self.mft_offset()? + number * MFT_RECORD_SIZE as u64)),
        }
    }

    /// Raw block of record `number`. Empty when the source holds no such
    /// record (past the end of the stream, or an INDX source).
    pub fn record_buf(&mut self, number: u64) -> Result<Vec<u8>, SiftError> {
        let base = match self.record_base(number)? {
            Some(base) => base,
            None => return Ok(Vec::new()),
        };

        self.inner.seek(SeekFrom::Start(base))?;
        let mut buf = vec![0u8; MFT_RECORD_SIZE];
        let n = read_up_to(&mut self.inner, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Parsed record `number`. An empty buffer means the number is not
    /// backed by the source.
    pub fn record(&mut self, number: u64) -> Result<MftRecord, SiftError> {
        let buf = self.record_buf(number)?;
        if buf.is_empty() {
            return Err(SiftError::InvalidMftRecordNumber(number));
        }
        MftRecord::parse(buf, number)
    }

    /// Iterate every record in order. Blocks that fail to parse are
    /// skipped; the inode counter advances regardless.
    pub fn records(&mut self) -> Records<'_, R> {
        Records {
            source: self,
            inode: 0,
            done: false,
        }
    }

    /// Find the active record whose reconstructed path equals `path`,
    /// compared case-insensitively. Linear scan over the whole source.
    pub fn record_by_path(
        &mut self,
        resolver: &mut PathResolver,
        path: &str,
    ) -> Result<Option<MftRecord>, SiftError> {
        // NTFS names are UTF-16, so the fold must cover more than ASCII
        let wanted = path.to_lowercase();
        let mut inode = 0u64;
        loop {
            let buf = self.record_buf(inode)?;
            if buf.is_empty() {
                return Ok(None);
            }

            let record = match MftRecord::parse(buf, inode) {
                Ok(record) => record,
                Err(_) => {
                    inode += 1;
                    continue;
                }
            };
            inode += 1;

            if record.magic() != MFT_RECORD_MAGIC || !record.is_active() {
                continue;
            }
            let record_path = resolver.build_path(self, &record)?;
            if record_path.to_lowercase() == wanted {
                return Ok(Some(record));
            }
        }
    }

    /// Raw read from a volume image. Other source kinds yield nothing.
    pub fn read(&mut self, offset: u64, length: usize) -> Result<Vec<u8>, SiftError> {
        if self.options.filetype != SourceType::Image {
            return Ok(Vec::new());
        }

        self.inner.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length];
        let n = read_up_to(&mut self.inner, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }
}

fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Sequential iterator over a source's records.
pub struct Records<'a, R> {
    source: &'a mut NtfsSource<R>,
    inode: u64,
    done: bool,
}

impl<R: Read + Seek> Iterator for Records<'_, R> {
    type Item = MftRecord;

    fn next(&mut self) -> Option<MftRecord> {
        if self.done {
            return None;
        }

        loop {
            let inode = self.inode;
            let buf = match self.source.record_buf(inode) {
                Ok(buf) => buf,
                Err(e) => {
                    warn!("Stopping record iteration at {}: {}", inode, e);
                    self.done = true;
                    return None;
                }
            };
            if buf.is_empty() {
                self.done = true;
                return None;
            }
            self.inode += 1;

            match MftRecord::parse(buf, inode) {
                Ok(record) => {
                    debug!("Yielding record {}", inode);
                    return Some(record);
                }
                Err(e) => {
                    debug!("Failed to parse MFT record {}: {}", inode, e);
                }
            }
        }
    }
}
