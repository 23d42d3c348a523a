// src/core/sink.rs
//! Append-only, key-deduplicated CSV output shared by concurrent workers

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::fs_ops::{CsvAppender, FsOps};
use crate::error::PipelineResult;

struct SinkState {
    appender: CsvAppender,
    known: HashSet<String>,
}

/// Rows are appended under a mutex, one writer at a time. Keys already on
/// disk (from an earlier run) or written earlier in this run are skipped.
pub struct DedupSink<T> {
    state: Mutex<SinkState>,
    key_fn: fn(&T) -> String,
    _marker: PhantomData<fn(T)>,
}

#[derive(Debug)]
pub struct SinkWrite<T> {
    pub written: Vec<T>,
    pub duplicates: usize,
}

impl<T: Serialize + DeserializeOwned> DedupSink<T> {
    /// Open the artifact at `path` and return the sink with the rows it already held.
    pub fn open(path: &Path, key_fn: fn(&T) -> String) -> PipelineResult<(Self, Vec<T>)> {
        let prior = FsOps::read_records::<T>(path)?.rows;
        let known = prior.iter().map(key_fn).collect::<HashSet<_>>();
        debug!("Resuming {} with {} known keys", path.display(), known.len());

        let sink = Self {
            state: Mutex::new(SinkState {
                appender: CsvAppender::open(path)?,
                known,
            }),
            key_fn,
            _marker: PhantomData,
        };
        Ok((sink, prior))
    }

    pub async fn append_new(&self, rows: Vec<T>) -> PipelineResult<SinkWrite<T>> {
        let mut state = self.state.lock().await;
        let mut keys = HashSet::new();
        let mut written = Vec::new();
        let mut duplicates = 0;
        for row in rows {
            let key = (self.key_fn)(&row);
            if !state.known.contains(&key) && keys.insert(key) {
                written.push(row);
            } else {
                duplicates += 1;
            }
        }
        // Keys become known only once their rows are on disk
        state.appender.append_all(&written)?;
        state.known.extend(keys);
        Ok(SinkWrite {
            written,
            duplicates,
        })
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.known.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CandidateLink, Platform};

    fn link(url: &str) -> CandidateLink {
        CandidateLink {
            platform: Platform::Lever,
            url: url.to_string(),
            query: "site:jobs.lever.co".to_string(),
        }
    }

    fn url_key(l: &CandidateLink) -> String {
        l.url.clone()
    }

    /// Refuses to serialize while `unwritable` is set.
    #[derive(Debug, serde::Deserialize)]
    struct Row {
        key: String,
        unwritable: bool,
    }

    impl Serialize for Row {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            use serde::ser::{Error, SerializeStruct};
            if self.unwritable {
                return Err(S::Error::custom("disk full"));
            }
            let mut row = serializer.serialize_struct("Row", 2)?;
            row.serialize_field("key", &self.key)?;
            row.serialize_field("unwritable", &self.unwritable)?;
            row.end()
        }
    }

    fn row_key(row: &Row) -> String {
        row.key.clone()
    }

    #[tokio::test]
    async fn test_failed_write_does_not_mark_keys_known() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let (sink, _) = DedupSink::open(&path, row_key).unwrap();

        let failed = sink
            .append_new(vec![Row {
                key: "a".into(),
                unwritable: true,
            }])
            .await;
        assert!(failed.is_err());
        assert_eq!(sink.len().await, 0);

        let retry = sink
            .append_new(vec![Row {
                key: "a".into(),
                unwritable: false,
            }])
            .await
            .unwrap();
        assert_eq!(retry.written.len(), 1);
        assert_eq!(retry.duplicates, 0);

        let on_disk = FsOps::read_records::<Row>(&path).unwrap().rows;
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0].key, "a");
    }

    #[tokio::test]
    async fn test_sink_skips_known_keys_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.csv");

        let (sink, prior) = DedupSink::open(&path, url_key).unwrap();
        assert!(prior.is_empty());
        let first = sink
            .append_new(vec![link("https://jobs.lever.co/a"), link("https://jobs.lever.co/a")])
            .await
            .unwrap();
        assert_eq!(first.written.len(), 1);
        assert_eq!(first.duplicates, 1);
        drop(sink);

        let (sink, prior) = DedupSink::open(&path, url_key).unwrap();
        assert_eq!(prior, vec![link("https://jobs.lever.co/a")]);
        let second = sink
            .append_new(vec![link("https://jobs.lever.co/a"), link("https://jobs.lever.co/b")])
            .await
            .unwrap();
        assert_eq!(second.written, vec![link("https://jobs.lever.co/b")]);
        assert_eq!(sink.len().await, 2);

        let on_disk = FsOps::read_records::<CandidateLink>(&path).unwrap().rows;
        assert_eq!(on_disk.len(), 2);
    }
}
