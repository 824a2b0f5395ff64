// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{collate::CollateStream, entry::Entry, BoxedStream};

/// Merges sorted metadata streams, listed newest first, into the
/// effective mirror state.
///
/// For each index the first stream holding a record wins. An index
/// whose winning record is a tombstone is deleted at that time and
/// omitted from the output. Feeding this a snapshot plus the diffs
/// leading back to a target time reconstructs the state at the target.
#[must_use]
pub fn patch(streams: Vec<BoxedStream<Entry>>) -> PatchStream {
    PatchStream {
        collate: CollateStream::new(streams),
    }
}

/// See [`patch`].
pub struct PatchStream {
    collate: CollateStream,
}

impl Iterator for PatchStream {
    type Item = crate::Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = fail_iter!(self.collate.next()?);

            let Some(entry) = row.into_iter().flatten().next() else {
                debug_assert!(false, "collated row should hold at least one record");
                continue;
            };

            if entry.is_tombstone() {
                continue;
            }

            return Some(Ok(entry));
        }
    }
}
