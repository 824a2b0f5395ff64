// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Append-only flat log files.
//!
//! A log is written once by a single producer, made durable on close,
//! and immutable from then on. Reading is streaming only; random access
//! inside a log is not supported.

use crate::{
    error::Error,
    extractor::{Extractor, ObjectStream, PrefixStream, Records},
    format::RecordFormat,
    index::PathIndex,
};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Records buffered before one batched write reaches the stream.
///
/// Compressors do noticeably better on fewer, larger writes.
const WRITE_BATCH: usize = 100;

pub(crate) fn is_compressed_name(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

enum LogStream {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Write for LogStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
        }
    }
}

/// Writer half of a flat log.
///
/// Created against a path that must not pre-exist. Dropping the writer
/// without [`LogWriter::close`] leaves an unsynced partial file behind,
/// which downstream recovery treats as an aborted snapshot.
pub struct LogWriter<F: RecordFormat> {
    path: PathBuf,
    stream: LogStream,
    batch: Vec<u8>,
    batched: usize,
    _format: PhantomData<F>,
}

impl<F: RecordFormat> LogWriter<F> {
    /// Creates the log at `path`, gzip-wrapped when the name ends in
    /// `.gz`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AlreadyExists`] instead of overwriting.
    pub fn create(path: impl Into<PathBuf>) -> crate::Result<Self> {
        let path = path.into();

        let file = File::options()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    Error::AlreadyExists(path.clone())
                } else {
                    Error::Io(e)
                }
            })?;

        let inner = BufWriter::new(file);
        let stream = if is_compressed_name(&path) {
            LogStream::Gzip(GzEncoder::new(inner, Compression::default()))
        } else {
            LogStream::Plain(inner)
        };

        log::debug!("created flat log {}", path.display());

        Ok(Self {
            path,
            stream,
            batch: Vec::new(),
            batched: 0,
            _format: PhantomData,
        })
    }

    /// The path this log is being written to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one pre-encoded record.
    pub fn write_record(&mut self, record: &[u8]) -> crate::Result<()> {
        self.batch.extend_from_slice(record);
        self.bump_batch()
    }

    /// Encodes and appends one object.
    pub fn write_object(&mut self, object: &F::Object) -> crate::Result<()> {
        F::to_record(object, &mut self.batch);
        self.bump_batch()
    }

    fn bump_batch(&mut self) -> crate::Result<()> {
        self.batched += 1;

        if self.batched >= WRITE_BATCH {
            self.flush_batch()?;
        }

        Ok(())
    }

    fn flush_batch(&mut self) -> crate::Result<()> {
        if !self.batch.is_empty() {
            self.stream.write_all(&self.batch)?;
            self.batch.clear();
        }
        self.batched = 0;

        Ok(())
    }

    /// Flushes everything, fsyncs the file and closes it.
    ///
    /// Only after `close` returns may the surrounding snapshot be
    /// declared complete. Consuming the writer makes double-close and
    /// write-after-close unrepresentable.
    pub fn close(mut self) -> crate::Result<()> {
        self.flush_batch()?;

        let mut inner = match self.stream {
            LogStream::Plain(w) => w,
            LogStream::Gzip(enc) => enc.finish()?,
        };
        inner.flush()?;
        inner.get_ref().sync_all()?;

        log::debug!("closed flat log {}", self.path.display());

        Ok(())
    }
}

/// Reader half of a flat log.
pub struct LogReader<F: RecordFormat> {
    extractor: Extractor<F>,
}

impl<F: RecordFormat> LogReader<F> {
    /// Opens `path` for streaming reads, unwrapping gzip when the name
    /// ends in `.gz`.
    pub fn open(path: &Path) -> crate::Result<Self> {
        let file = File::open(path)?;

        let reader: Box<dyn BufRead> = if is_compressed_name(path) {
            Box::new(BufReader::new(GzDecoder::new(BufReader::new(file))))
        } else {
            Box::new(BufReader::new(file))
        };

        log::trace!("opened flat log {}", path.display());

        Ok(Self {
            extractor: Extractor::new(reader),
        })
    }

    /// All decoded objects, in write order.
    #[must_use]
    pub fn objects(self) -> ObjectStream<F> {
        self.extractor.objects()
    }

    /// Decoded objects whose index extends `prefix`.
    #[must_use]
    pub fn objects_from(self, prefix: PathIndex) -> PrefixStream<F> {
        self.extractor.objects_from(prefix)
    }

    /// Raw records, undecoded.
    #[must_use]
    pub fn records(self) -> Records<F> {
        self.extractor.records()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entry::{Entry, FileKind},
        record::MetadataFormat,
    };
    use test_log::test;

    fn entries() -> Vec<Entry> {
        (0..250)
            .map(|i| {
                let mut entry = Entry::new(
                    PathIndex::from(["data", &format!("f{i:04}")]),
                    FileKind::Regular,
                );
                entry.size = Some(i);
                entry.mtime = Some(1_700_000_000);
                entry
            })
            .collect()
    }

    #[test]
    fn write_close_read_round_trip() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("mirror_metadata.t.snapshot");

        let mut writer = LogWriter::<MetadataFormat>::create(&path)?;
        for entry in entries() {
            writer.write_object(&entry)?;
        }
        writer.close()?;

        let read = LogReader::<MetadataFormat>::open(&path)?
            .objects()
            .collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(entries(), read);

        Ok(())
    }

    #[test]
    fn gzip_round_trip() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("mirror_metadata.t.snapshot.gz");

        let mut writer = LogWriter::<MetadataFormat>::create(&path)?;
        for entry in entries() {
            writer.write_object(&entry)?;
        }
        writer.close()?;

        // really gzip on disk
        let raw = std::fs::read(&path)?;
        assert!(raw.starts_with(&[0x1f, 0x8b]));

        let read = LogReader::<MetadataFormat>::open(&path)?
            .objects()
            .collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(entries(), read);

        Ok(())
    }

    #[test]
    fn prefix_read_from_file() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("mirror_metadata.t.snapshot");

        let mut writer = LogWriter::<MetadataFormat>::create(&path)?;
        for entry in entries() {
            writer.write_object(&entry)?;
        }
        writer.close()?;

        let read = LogReader::<MetadataFormat>::open(&path)?
            .objects_from(PathIndex::from(["data", "f0100"]))
            .collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(1, read.len());

        Ok(())
    }

    #[test]
    fn refuses_to_overwrite() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("mirror_metadata.t.snapshot");

        LogWriter::<MetadataFormat>::create(&path)?.close()?;

        match LogWriter::<MetadataFormat>::create(&path).err() {
            Some(Error::AlreadyExists(existing)) => assert_eq!(path, existing),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn small_batches_are_flushed_on_close() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("mirror_metadata.t2.snapshot");

        let mut writer = LogWriter::<MetadataFormat>::create(&path)?;
        let entry = Entry::tombstone(PathIndex::from(["only"]));
        writer.write_object(&entry)?;
        writer.close()?;

        let read = LogReader::<MetadataFormat>::open(&path)?
            .objects()
            .collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(vec![entry], read);

        Ok(())
    }
}
