// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A metadata store for incremental, rsync-style mirror backups.
//!
//! The mirror filesystem cannot always represent what the source
//! filesystem carries: ownership without root, ACLs, resource forks,
//! strange timestamps. So every backup session writes the full per-file
//! metadata into flat, append-only, possibly gzip-wrapped log files
//! next to the mirror, one set per snapshot time. Reading metadata
//! sequentially from such a log is also far cheaper than re-statting an
//! entire mirror tree.
//!
//! A log is a concatenation of human-readable records:
//!
//! ```text
//! File etc/hosts
//!   Type reg
//!   Size 17
//!   ...
//! ```
//!
//! Logs are written once, made durable with an fsync on close, and
//! never mutated. Old logs must stay readable forever, so the codec is
//! bit-stable. Reading is streaming with a bounded buffer, so a
//! many-gigabyte log costs no more memory than a small one.
//!
//! # Example usage
//!
//! ```
//! use mirror_meta::{Config, Entry, FileKind, LogRole, PathIndex};
//!
//! # let dir = tempfile::tempdir()?;
//! let store = Config::new(dir.path()).open()?;
//!
//! // record one snapshot
//! let mut writer = store.writer_at(LogRole::Snapshot, "2026-08-01T10:00:00Z")?;
//!
//! let mut entry = Entry::new(PathIndex::from(["etc", "hosts"]), FileKind::Regular);
//! entry.size = Some(17);
//! entry.mtime = Some(1_753_900_000);
//! writer.write(&entry)?;
//!
//! writer.close()?;
//!
//! // a freshly opened manager sees the new log
//! let store = Config::new(dir.path()).open()?;
//! let records = store
//!     .at("2026-08-01T10:00:00Z", None)?
//!     .expect("snapshot was written")
//!     .collect::<mirror_meta::Result<Vec<_>>>()?;
//!
//! assert_eq!(vec![entry], records);
//! #
//! # Ok::<(), mirror_meta::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::missing_errors_doc)]

macro_rules! fail_iter {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return Some(Err(e)),
        }
    };
}

mod acl;
mod carbon;
mod collate;
mod combined;
mod diff;
mod ea;
mod entry;
mod error;
mod extractor;
mod flat_file;
mod format;
mod index;
mod join;
mod manager;
mod patch;
mod quote;
mod record;
mod time;

/// Owned stream of fallible items, the shape every reader hands out.
pub type BoxedStream<T> = Box<dyn Iterator<Item = Result<T>>>;

pub use {
    acl::{AccessControlList, AclEntry, AclFormat, AclTag},
    carbon::CarbonFile,
    collate::CollateStream,
    combined::CombinedWriter,
    diff::{diff_entries, DiffStream},
    ea::{EaFormat, ExtendedAttributes},
    entry::{DeviceKind, DeviceNumbers, Entry, FileKind},
    error::{Error, ParseError, Result},
    extractor::{Extractor, ObjectStream, PrefixStream, Records},
    flat_file::{LogReader, LogWriter},
    format::RecordFormat,
    index::PathIndex,
    join::{JoinStream, Sidecar},
    manager::{Config, IncrementFile, LogRole, Manager},
    patch::{patch, PatchStream},
    quote::{quote, unquote},
    record::MetadataFormat,
    time::now_string,
};
