// Path reconstruction for MFT records.
//
// Walks parent references toward the volume root, recognizing reallocated
// parents by their sequence numbers and reference cycles by a per-call
// visited set. Results are memoized in a small LRU keyed by record
// identity, so a reallocated record never serves a stale path.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{Read, Seek};

use log::debug;
use sift_core::SiftError;

use crate::mft::MftRecord;
use crate::reader::NtfsSource;
use crate::structures::{split_reference, MFT_RECORD_ROOT};

/// Bound on the number of memoized paths.
const PATH_CACHE_CAPACITY: usize = 100;

/// Composite record identity used as the memoization key. Every field that
/// changes when a record is reused participates, so key equality implies
/// the cached path is still the right one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    magic: u32,
    lsn: u64,
    link_count: u16,
    record_number: u64,
    flags: u16,
}

impl CacheKey {
    fn of(record: &MftRecord) -> Self {
        Self {
            magic: record.magic(),
            lsn: record.lsn(),
            link_count: record.link_count(),
            record_number: record.record_number(),
            flags: record.flags(),
        }
    }
}

/// Bounded map with least-recently-used eviction.
struct PathCache {
    map: HashMap<CacheKey, String>,
    order: VecDeque<CacheKey>,
    capacity: usize,
}

impl PathCache {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&mut self, key: &CacheKey) -> Option<String> {
        let value = self.map.get(key).cloned()?;
        self.touch(key);
        Some(value)
    }

    fn touch(&mut self, key: &CacheKey) {
        if let Some(position) = self.order.iter().position(|k| k == key) {
            self.order.remove(position);
        }
        self.order.push_back(key.clone());
    }

    fn put(&mut self, key: CacheKey, value: String) {
        if self.map.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push_back(key);
        while self.map.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.map.remove(&oldest);
                }
                None => break,
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map.len()
    }
}

enum Resolution {
    Path(String),
    Cycle,
}

/// Reconstructs backslash-delimited paths for MFT records.
pub struct PathResolver {
    cache: PathCache,
    prefix: Option<String>,
}

impl PathResolver {
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            cache: PathCache::new(PATH_CACHE_CAPACITY),
            prefix,
        }
    }

    fn root(&self) -> String {
        match &self.prefix {
            Some(prefix) => prefix.clone(),
            None => "\\.".to_string(),
        }
    }

    /// Reconstruct the path of `record`, fetching parent records from
    /// `source` as needed. A record without a usable filename resolves to
    /// `\??`, a reallocated parent to `\$OrphanFiles\<name>`, and a parent
    /// reference cycle to `\<CYCLE>` (prefixed when a prefix is set).
    pub fn build_path<R: Read + Seek>(
        &mut self,
        source: &mut NtfsSource<R>,
        record: &MftRecord,
    ) -> Result<String, SiftError> {
        let mut visited = HashSet::new();
        match self.resolve(source, record, &mut visited)? {
            Resolution::Path(path) => Ok(path),
            Resolution::Cycle => Ok(format!(
                "{}\\<CYCLE>",
                self.prefix.as_deref().unwrap_or("")
            )),
        }
    }

    fn resolve<R: Read + Seek>(
        &mut self,
        source: &mut NtfsSource<R>,
        record: &MftRecord,
        visited: &mut HashSet<u64>,
    ) -> Result<Resolution, SiftError> {
        let key = CacheKey::of(record);
        if let Some(path) = self.cache.get(&key) {
            return Ok(Resolution::Path(path));
        }

        let record_number = record.record_number() & 0xFFFF_FFFF_FFFF;
        if record_number == MFT_RECORD_ROOT {
            let path = self.root();
            self.cache.put(key, path.clone());
            return Ok(Resolution::Path(path));
        }

        let fn_attr = match record.filename_information() {
            Some(fn_attr) => fn_attr,
            None => return Ok(Resolution::Path("\\??".to_string())),
        };
        let name = match fn_attr.filename() {
            Ok(name) => name,
            Err(_) => return Ok(Resolution::Path("\\??".to_string())),
        };

        let (parent_number, expected_sequence) = split_reference(fn_attr.parent_reference);
        let parent_buf = source.record_buf(parent_number)?;
        if parent_buf.is_empty() {
            return Ok(Resolution::Path(format!("\\??\\{}", name)));
        }
        let parent = match MftRecord::parse(parent_buf, parent_number) {
            Ok(parent) => parent,
            Err(_) => return Ok(Resolution::Path(format!("\\??\\{}", name))),
        };

        // a sequence mismatch means the parent record has been reused
        if parent.sequence_number() != expected_sequence {
            return Ok(Resolution::Path(format!("\\$OrphanFiles\\{}", name)));
        }

        if !visited.insert(record_number) {
            debug!("Cycle detected at record {}", record_number);
            return Ok(Resolution::Cycle);
        }

        let parent_path = match self.resolve(source, &parent, visited)? {
            Resolution::Path(path) => path,
            Resolution::Cycle => return Ok(Resolution::Cycle),
        };

        let path = format!("{}\\{}", parent_path, name);
        self.cache.put(key, path.clone());
        Ok(Resolution::Path(path))
    }
}
