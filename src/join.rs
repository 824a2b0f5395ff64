// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    acl::AccessControlList, ea::ExtendedAttributes, entry::Entry, index::PathIndex, BoxedStream,
};

/// A record family that rides in a sidecar log and is reattached to the
/// metadata stream by index.
pub trait Sidecar {
    /// Human label for log messages.
    const WHAT: &'static str;

    /// The index the record sorts by.
    fn index(&self) -> &PathIndex;

    /// Attaches the record to its entry.
    fn attach(self, entry: &mut Entry);
}

impl Sidecar for ExtendedAttributes {
    const WHAT: &'static str = "extended attributes";

    fn index(&self) -> &PathIndex {
        &self.index
    }

    fn attach(self, entry: &mut Entry) {
        entry.ea = Some(self);
    }
}

impl Sidecar for AccessControlList {
    const WHAT: &'static str = "access control list";

    fn index(&self) -> &PathIndex {
        &self.index
    }

    fn attach(self, entry: &mut Entry) {
        entry.acl = Some(self);
    }
}

/// Joins a sorted entry stream with a sorted sidecar stream.
///
/// Both inputs must share the path-index ordering. A sidecar record
/// with no matching entry is dropped with a warning; an entry with no
/// sidecar record passes through untouched.
pub struct JoinStream<T: Sidecar> {
    entries: BoxedStream<Entry>,
    sidecars: BoxedStream<T>,
    head: Option<T>,
    sidecars_done: bool,
}

impl<T: Sidecar> JoinStream<T> {
    /// Wraps the two streams.
    #[must_use]
    pub fn new(entries: BoxedStream<Entry>, sidecars: BoxedStream<T>) -> Self {
        Self {
            entries,
            sidecars,
            head: None,
            sidecars_done: false,
        }
    }
}

impl<T: Sidecar> Iterator for JoinStream<T> {
    type Item = crate::Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut entry = match self.entries.next()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e)),
        };

        loop {
            if self.head.is_none() && !self.sidecars_done {
                match self.sidecars.next() {
                    None => self.sidecars_done = true,
                    Some(Ok(record)) => self.head = Some(record),
                    Some(Err(e)) => return Some(Err(e)),
                }
            }

            let Some(record) = &self.head else {
                break;
            };

            match record.index().cmp(&entry.index) {
                std::cmp::Ordering::Less => {
                    log::warn!(
                        "{} record for {} has no matching metadata entry",
                        T::WHAT,
                        record.index(),
                    );
                    self.head = None;
                }
                std::cmp::Ordering::Equal => {
                    if let Some(record) = self.head.take() {
                        record.attach(&mut entry);
                    }
                    break;
                }
                std::cmp::Ordering::Greater => break,
            }
        }

        Some(Ok(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::FileKind;
    use test_log::test;

    fn entry(name: &str) -> Entry {
        Entry::new(PathIndex::from([name]), FileKind::Regular)
    }

    fn eas(name: &str) -> ExtendedAttributes {
        let mut eas = ExtendedAttributes::new(PathIndex::from([name]));
        eas.set(&b"user.tag"[..], name.as_bytes());
        eas
    }

    fn boxed<T: 'static>(items: Vec<T>) -> BoxedStream<T> {
        Box::new(items.into_iter().map(Ok))
    }

    #[test]
    fn matching_records_are_attached() -> crate::Result<()> {
        let entries = boxed(vec![entry("a"), entry("b"), entry("c")]);
        let sidecars = boxed(vec![eas("a"), eas("c")]);

        let joined = JoinStream::new(entries, sidecars).collect::<crate::Result<Vec<_>>>()?;

        assert_eq!(Some(eas("a")), joined[0].ea);
        assert_eq!(None, joined[1].ea);
        assert_eq!(Some(eas("c")), joined[2].ea);

        Ok(())
    }

    #[test]
    fn orphaned_sidecar_record_is_dropped() -> crate::Result<()> {
        let entries = boxed(vec![entry("b")]);
        let sidecars = boxed(vec![eas("a"), eas("b")]);

        let joined = JoinStream::new(entries, sidecars).collect::<crate::Result<Vec<_>>>()?;

        assert_eq!(1, joined.len());
        assert_eq!(Some(eas("b")), joined[0].ea);

        Ok(())
    }

    #[test]
    fn empty_sidecar_stream_passes_entries_through() -> crate::Result<()> {
        let entries = boxed(vec![entry("a"), entry("b")]);
        let sidecars: BoxedStream<ExtendedAttributes> = boxed(Vec::new());

        let joined = JoinStream::new(entries, sidecars).collect::<crate::Result<Vec<_>>>()?;

        assert!(joined.iter().all(|entry| entry.ea.is_none()));

        Ok(())
    }
}
