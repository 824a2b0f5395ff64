// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Streaming record extraction over flat logs.
//!
//! A metadata log can be many gigabytes, so records are pulled off the
//! stream through a bounded buffer: one block plus however much of the
//! current record has accumulated, never the whole log. Logs carry no
//! index; positioning is a linear scan over boundary lines, which
//! amortizes well when a range of a large log is wanted and costs one
//! pass when all of it is.

use crate::{format::RecordFormat, index::PathIndex};
use std::io::{BufRead, Read};
use std::marker::PhantomData;

/// Bytes pulled from the underlying stream per refill.
const BLOCK_SIZE: u64 = 32 * 1024;

/// Pulls records off a byte stream one boundary at a time.
pub struct Extractor<F: RecordFormat> {
    reader: Option<Box<dyn BufRead>>,
    buf: Vec<u8>,
    at_end: bool,
    finished: bool,
    _format: PhantomData<F>,
}

impl<F: RecordFormat> Extractor<F> {
    /// Wraps a buffered byte stream.
    #[must_use]
    pub fn new(reader: Box<dyn BufRead>) -> Self {
        Self {
            reader: Some(reader),
            buf: Vec::new(),
            at_end: false,
            finished: false,
            _format: PhantomData,
        }
    }

    /// All decoded objects, in log order.
    #[must_use]
    pub fn objects(self) -> ObjectStream<F> {
        ObjectStream { extractor: self }
    }

    /// Decoded objects whose index extends `prefix`, in log order.
    #[must_use]
    pub fn objects_from(self, prefix: PathIndex) -> PrefixStream<F> {
        PrefixStream {
            extractor: self,
            prefix,
            started: false,
        }
    }

    /// Raw record blocks, in log order.
    #[must_use]
    pub fn records(self) -> Records<F> {
        Records { extractor: self }
    }

    fn hit_end(&self) -> bool {
        self.at_end
    }

    /// Drops the underlying stream and fuses the extractor.
    fn close(&mut self) {
        self.reader = None;
        self.finished = true;
    }

    fn refill(&mut self) -> std::io::Result<usize> {
        let Some(reader) = &mut self.reader else {
            return Ok(0);
        };

        reader.as_mut().take(BLOCK_SIZE).read_to_end(&mut self.buf)
    }

    /// Position of the next record boundary, growing the buffer until
    /// one is visible or the stream ends.
    ///
    /// The search starts at offset 1 so the boundary opening the
    /// current record is not re-matched.
    fn next_boundary(&mut self) -> std::io::Result<usize> {
        loop {
            if self.buf.len() > 1 {
                if let Some(found) = F::boundary().find_at(&self.buf, 1) {
                    return Ok(found.start());
                }
            }

            if self.refill()? == 0 {
                self.at_end = true;
                return Ok(self.buf.len());
            }
        }
    }

    /// Takes the record at the front of the buffer, or `None` once the
    /// final record has been handed out. The underlying stream is
    /// closed at that point.
    fn next_record(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        if self.finished {
            return Ok(None);
        }

        let pos = self.next_boundary()?;
        let record = self.buf.drain(..pos).collect();

        if self.at_end {
            self.close();
        }

        Ok(Some(record))
    }

    /// Discards records until the buffer starts at the first record
    /// whose index is `>= target`.
    ///
    /// Scanned blocks are dropped wholesale; only boundary lines are
    /// decoded, not whole records. Each block is extended to the next
    /// LF so the buffer always ends on a line boundary and no marker
    /// line is ever split in half.
    fn skip_to_index(&mut self, target: &PathIndex) -> std::io::Result<()> {
        loop {
            self.buf.clear();
            self.refill()?;
            if let Some(reader) = &mut self.reader {
                reader.read_until(b'\n', &mut self.buf)?;
            }

            if self.buf.is_empty() {
                self.at_end = true;
                return Ok(());
            }

            let mut pos = 0;

            while pos <= self.buf.len() {
                let Some(caps) = F::boundary().captures_at(&self.buf, pos) else {
                    break;
                };
                let Some(whole) = caps.get(0) else {
                    break;
                };
                let token = caps.get(1).map_or(&b""[..], |m| m.as_bytes());

                if F::token_to_index(token) >= *target {
                    self.buf.drain(..whole.start());
                    return Ok(());
                }

                pos = whole.end();
            }
        }
    }
}

/// Streams raw records.
pub struct Records<F: RecordFormat> {
    extractor: Extractor<F>,
}

impl<F: RecordFormat> Iterator for Records<F> {
    type Item = crate::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.extractor.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.extractor.close();
                Some(Err(e.into()))
            }
        }
    }
}

/// Streams decoded objects, skipping damaged records.
pub struct ObjectStream<F: RecordFormat> {
    extractor: Extractor<F>,
}

impl<F: RecordFormat> Iterator for ObjectStream<F> {
    type Item = crate::Result<F::Object>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.extractor.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => return None,
                Err(e) => {
                    self.extractor.close();
                    return Some(Err(e.into()));
                }
            };

            match F::to_object(&record) {
                Ok(object) => return Some(Ok(object)),
                Err(e) => {
                    // A partial final record is legitimate after a kill
                    // mid-write; anything earlier is worth a warning.
                    if self.extractor.hit_end() {
                        return None;
                    }
                    log::warn!("skipping unparsable record: {e}");
                }
            }
        }
    }
}

/// Streams decoded objects whose index extends a given prefix.
pub struct PrefixStream<F: RecordFormat> {
    extractor: Extractor<F>,
    prefix: PathIndex,
    started: bool,
}

impl<F: RecordFormat> Iterator for PrefixStream<F> {
    type Item = crate::Result<F::Object>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;

            if let Err(e) = self.extractor.skip_to_index(&self.prefix) {
                self.extractor.close();
                return Some(Err(e.into()));
            }

            if self.extractor.hit_end() {
                self.extractor.close();
                return None;
            }
        }

        loop {
            let record = match self.extractor.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => return None,
                Err(e) => {
                    self.extractor.close();
                    return Some(Err(e.into()));
                }
            };

            match F::to_object(&record) {
                Ok(object) => {
                    if !F::index(&object).starts_with(&self.prefix) {
                        self.extractor.close();
                        return None;
                    }
                    return Some(Ok(object));
                }
                Err(e) => log::warn!("failed to parse record during prefix scan: {e}"),
            }
        }
    }
}
