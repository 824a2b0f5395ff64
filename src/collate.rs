// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{entry::Entry, BoxedStream};

/// Aligns several sorted entry streams by index.
///
/// For every index present in at least one input, yields one row
/// holding the record each stream has for that index, `None` in the
/// slots that lack one. All inputs must share the path-index ordering;
/// an unsorted input is a caller bug.
pub struct CollateStream {
    inputs: Vec<BoxedStream<Entry>>,
    heads: Vec<Option<Entry>>,
    primed: bool,
}

impl CollateStream {
    /// Wraps the input streams; slot order is preserved in every row.
    #[must_use]
    pub fn new(inputs: Vec<BoxedStream<Entry>>) -> Self {
        let heads = inputs.iter().map(|_| None).collect();

        Self {
            inputs,
            heads,
            primed: false,
        }
    }

    fn advance(&mut self, slot: usize) -> crate::Result<()> {
        let head = match self.inputs.get_mut(slot).and_then(Iterator::next) {
            None => None,
            Some(Ok(entry)) => Some(entry),
            Some(Err(e)) => return Err(e),
        };

        if let Some(stored) = self.heads.get_mut(slot) {
            *stored = head;
        }

        Ok(())
    }
}

impl Iterator for CollateStream {
    type Item = crate::Result<Vec<Option<Entry>>>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.primed {
            self.primed = true;

            for slot in 0..self.inputs.len() {
                fail_iter!(self.advance(slot));
            }
        }

        let min = self
            .heads
            .iter()
            .flatten()
            .map(|entry| entry.index.clone())
            .min()?;

        let mut row = Vec::with_capacity(self.heads.len());

        for slot in 0..self.heads.len() {
            let matches = self
                .heads
                .get(slot)
                .and_then(Option::as_ref)
                .is_some_and(|entry| entry.index == min);

            if matches {
                row.push(self.heads.get_mut(slot).and_then(Option::take));
                fail_iter!(self.advance(slot));
            } else {
                row.push(None);
            }
        }

        Some(Ok(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{entry::FileKind, index::PathIndex};
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
    fn rows_cover_every_index_in_order() -> crate::Result<()> {
        let collated = CollateStream::new(vec![
            boxed(vec![entry("a", 0), entry("c", 0)]),
            boxed(vec![entry("b", 1), entry("c", 1)]),
        ])
        .collect::<crate::Result<Vec<_>>>()?;

        assert_eq!(
            vec![
                vec![Some(entry("a", 0)), None],
                vec![None, Some(entry("b", 1))],
                vec![Some(entry("c", 0)), Some(entry("c", 1))],
            ],
            collated,
        );

        Ok(())
    }

    #[test]
    fn empty_inputs_produce_nothing() {
        assert_eq!(0, CollateStream::new(vec![boxed(Vec::new())]).count());
        assert_eq!(0, CollateStream::new(Vec::new()).count());
    }

    #[test]
    fn single_input_passes_through() -> crate::Result<()> {
        let collated = CollateStream::new(vec![boxed(vec![entry("a", 0), entry("b", 0)])])
            .collect::<crate::Result<Vec<_>>>()?;

        assert_eq!(2, collated.len());
        assert_eq!(vec![Some(entry("a", 0))], collated[0]);

        Ok(())
    }
}
