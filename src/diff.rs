// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{collate::CollateStream, entry::Entry, BoxedStream};

/// Reduces an older snapshot to the records a diff log must hold.
///
/// The diff carries the older record wherever the two snapshots
/// disagree, and a tombstone wherever the newer snapshot has an index
/// the older one lacks. The diff uses the snapshot wire format
/// unchanged, so `patch([diff, newer])` reproduces the older stream
/// exactly.
#[must_use]
pub fn diff_entries(old: BoxedStream<Entry>, new: BoxedStream<Entry>) -> DiffStream {
    DiffStream {
        collate: CollateStream::new(vec![old, new]),
    }
}

/// See [`diff_entries`].
pub struct DiffStream {
    collate: CollateStream,
}

impl Iterator for DiffStream {
    type Item = crate::Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = fail_iter!(self.collate.next()?);

            let mut slots = row.into_iter();
            let old = slots.next().flatten();
            let new = slots.next().flatten();

            match (old, new) {
                (Some(old), Some(new)) => {
                    if old != new {
                        return Some(Ok(old));
                    }
                }
                (Some(old), None) => return Some(Ok(old)),
                (None, Some(new)) => return Some(Ok(Entry::tombstone(new.index))),
                (None, None) => {
                    debug_assert!(false, "collated row should hold at least one record");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{entry::FileKind, index::PathIndex, patch::patch};
    use test_log::test;

    fn entry(name: &str, size: u64) -> Entry {
        let mut entry = Entry::new(PathIndex::from([name]), FileKind::Regular);
        entry.size = Some(size);
        entry
    }

    fn boxed(entries: Vec<Entry>) -> BoxedStream<Entry> {
        Box::new(entries.into_iter().map(Ok))
    }

    #[test]
    fn unchanged_records_are_omitted() -> crate::Result<()> {
        let old = vec![entry("a", 1), entry("b", 1)];
        let new = vec![entry("a", 1), entry("b", 2)];

        let diff =
            diff_entries(boxed(old), boxed(new)).collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(vec![entry("b", 1)], diff);

        Ok(())
    }

    #[test]
    fn created_files_become_tombstones() -> crate::Result<()> {
        let old = vec![entry("a", 1)];
        let new = vec![entry("a", 1), entry("created", 1)];

        let diff =
            diff_entries(boxed(old), boxed(new)).collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(
            vec![Entry::tombstone(PathIndex::from(["created"]))],
            diff,
        );

        Ok(())
    }

    #[test]
    fn deleted_files_keep_their_old_record() -> crate::Result<()> {
        let old = vec![entry("a", 1), entry("deleted", 1)];
        let new = vec![entry("a", 1)];

        let diff =
            diff_entries(boxed(old), boxed(new)).collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(vec![entry("deleted", 1)], diff);

        Ok(())
    }

    #[test]
    fn patching_the_diff_over_the_new_snapshot_restores_the_old() -> crate::Result<()> {
        let old = vec![
            entry("changed", 1),
            entry("deleted", 1),
            entry("same", 7),
        ];
        let new = vec![
            entry("changed", 2),
            entry("created", 1),
            entry("same", 7),
        ];

        let diff = diff_entries(boxed(old.clone()), boxed(new.clone()))
            .collect::<crate::Result<Vec<_>>>()?;

        let restored = patch(vec![boxed(diff), boxed(new)])
            .collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(old, restored);

        Ok(())
    }
}
