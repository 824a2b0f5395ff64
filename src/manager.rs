// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Grouping increment logs by snapshot time.
//!
//! A backup data directory accumulates one set of logs per snapshot,
//! named `<prefix>.<timestamp>.<typestr>[.gz]`. The manager indexes the
//! directory once, hands out readers and joined streams for a given
//! time, and opens the writers for a new snapshot.

use crate::{
    acl::AclFormat,
    combined::CombinedWriter,
    diff::diff_entries,
    ea::EaFormat,
    entry::Entry,
    error::Error,
    flat_file::{LogReader, LogWriter},
    format::RecordFormat,
    index::PathIndex,
    join::JoinStream,
    record::MetadataFormat,
    time, BoxedStream,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Role of an increment log within its snapshot time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogRole {
    /// Complete recorded state at one time
    Snapshot,

    /// Only the records differing from a referenced snapshot
    Diff,
}

impl LogRole {
    /// The filename spelling of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Diff => "diff",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "snapshot" => Some(Self::Snapshot),
            "diff" => Some(Self::Diff),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recognized increment file in the data directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncrementFile {
    /// Full path of the log.
    pub path: PathBuf,

    /// Record-family prefix, e.g. `mirror_metadata`.
    pub prefix: String,

    /// Snapshot timestamp string.
    pub timestamp: String,

    /// Snapshot or diff.
    pub role: LogRole,

    /// `true` when the byte stream is gzip-wrapped.
    pub compressed: bool,
}

const PREFIXES: [&str; 3] = [
    MetadataFormat::PREFIX,
    EaFormat::PREFIX,
    AclFormat::PREFIX,
];

fn parse_increment_name(dir: &Path, name: &str) -> Option<IncrementFile> {
    let (stem, compressed) = match name.strip_suffix(".gz") {
        Some(stem) => (stem, true),
        None => (name, false),
    };

    for prefix in PREFIXES {
        let Some(rest) = stem.strip_prefix(prefix).and_then(|r| r.strip_prefix('.')) else {
            continue;
        };

        let (timestamp, role) = rest.rsplit_once('.')?;
        let role = LogRole::parse(role)?;

        if timestamp.is_empty() {
            return None;
        }

        return Some(IncrementFile {
            path: dir.join(name),
            prefix: prefix.to_owned(),
            timestamp: timestamp.to_owned(),
            role,
            compressed,
        });
    }

    None
}

/// Options for opening a backup data directory.
#[derive(Clone, Debug)]
pub struct Config {
    dir: PathBuf,
    eas: bool,
    acls: bool,
    compress: bool,
}

impl Config {
    /// Starts options for `dir`: sidecar logs inactive, compression on.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            eas: false,
            acls: false,
            compress: true,
        }
    }

    /// Toggles the extended-attributes sidecar log.
    #[must_use]
    pub fn extended_attributes(mut self, active: bool) -> Self {
        self.eas = active;
        self
    }

    /// Toggles the access-control-list sidecar log.
    #[must_use]
    pub fn access_control_lists(mut self, active: bool) -> Self {
        self.acls = active;
        self
    }

    /// Toggles gzip wrapping of newly created logs.
    #[must_use]
    pub fn compression(mut self, active: bool) -> Self {
        self.compress = active;
        self
    }

    /// Indexes the directory and opens a manager handle.
    pub fn open(self) -> crate::Result<Manager> {
        let mut by_time: BTreeMap<String, Vec<IncrementFile>> = BTreeMap::new();

        for dirent in std::fs::read_dir(&self.dir)? {
            let dirent = dirent?;
            let name = dirent.file_name();

            let Some(name) = name.to_str() else {
                continue;
            };

            if let Some(inc) = parse_increment_name(&self.dir, name) {
                by_time.entry(inc.timestamp.clone()).or_default().push(inc);
            }
        }

        log::debug!(
            "indexed {} snapshot times in {}",
            by_time.len(),
            self.dir.display(),
        );

        Ok(Manager {
            dir: self.dir,
            eas: self.eas,
            acls: self.acls,
            compress: self.compress,
            by_time,
        })
    }
}

/// Locates, reads and writes the increment logs of one data directory.
///
/// The directory listing is taken once at construction and never
/// refreshed; logs created afterwards are seen by a freshly opened
/// manager. That matches how backups run, one snapshot at a time.
pub struct Manager {
    dir: PathBuf,
    eas: bool,
    acls: bool,
    compress: bool,
    by_time: BTreeMap<String, Vec<IncrementFile>>,
}

impl Manager {
    /// Snapshot times with at least one increment log, oldest first.
    pub fn timestamps(&self) -> impl Iterator<Item = &str> {
        self.by_time.keys().map(String::as_str)
    }

    fn find(&self, time: &str, prefix: &str) -> Option<&IncrementFile> {
        self.by_time
            .get(time)?
            .iter()
            .find(|inc| inc.prefix == prefix)
    }

    fn objects_at<F: RecordFormat + 'static>(
        &self,
        time: &str,
        restrict: Option<&PathIndex>,
    ) -> crate::Result<Option<BoxedStream<F::Object>>>
    where
        F::Object: 'static,
    {
        let Some(inc) = self.find(time, F::PREFIX) else {
            return Ok(None);
        };

        let reader = LogReader::<F>::open(&inc.path)?;

        Ok(Some(match restrict {
            Some(prefix) => Box::new(reader.objects_from(prefix.clone())),
            None => Box::new(reader.objects()),
        }))
    }

    /// Metadata records at `time`, or `None` if no such log exists.
    pub fn metadata_at(
        &self,
        time: &str,
        restrict: Option<&PathIndex>,
    ) -> crate::Result<Option<BoxedStream<Entry>>> {
        self.objects_at::<MetadataFormat>(time, restrict)
    }

    /// Extended-attribute records at `time`, or `None` if no such log
    /// exists.
    pub fn eas_at(
        &self,
        time: &str,
        restrict: Option<&PathIndex>,
    ) -> crate::Result<Option<BoxedStream<crate::ExtendedAttributes>>> {
        self.objects_at::<EaFormat>(time, restrict)
    }

    /// Access-control-list records at `time`, or `None` if no such log
    /// exists.
    pub fn acls_at(
        &self,
        time: &str,
        restrict: Option<&PathIndex>,
    ) -> crate::Result<Option<BoxedStream<crate::AccessControlList>>> {
        self.objects_at::<AclFormat>(time, restrict)
    }

    /// The joined stream at `time`: metadata with extended attributes
    /// and ACLs attached where those logs are active.
    ///
    /// `None` means no metadata log exists at `time`; the caller falls
    /// back to filesystem traversal. An active but missing sidecar log
    /// only costs a warning, metadata still flows.
    pub fn at(
        &self,
        time: &str,
        restrict: Option<&PathIndex>,
    ) -> crate::Result<Option<BoxedStream<Entry>>> {
        let Some(mut stream) = self.metadata_at(time, restrict)? else {
            log::warn!("no metadata log at {time}; metadata must be read from the filesystem");
            return Ok(None);
        };

        if self.acls {
            let acls: BoxedStream<crate::AccessControlList> = match self.acls_at(time, restrict)? {
                Some(acls) => acls,
                None => {
                    log::warn!("access control list log missing at {time}");
                    Box::new(std::iter::empty())
                }
            };
            stream = Box::new(JoinStream::new(stream, acls));
        }

        if self.eas {
            let eas: BoxedStream<crate::ExtendedAttributes> = match self.eas_at(time, restrict)? {
                Some(eas) => eas,
                None => {
                    log::warn!("extended attributes log missing at {time}");
                    Box::new(std::iter::empty())
                }
            };
            stream = Box::new(JoinStream::new(stream, eas));
        }

        Ok(Some(stream))
    }

    fn log_path(&self, prefix: &str, time: &str, role: LogRole) -> PathBuf {
        let gz = if self.compress { ".gz" } else { "" };
        self.dir.join(format!("{prefix}.{time}.{role}{gz}"))
    }

    /// Opens the writers for a new set of logs at `time`.
    ///
    /// Sidecar writers are opened only when their subsystem is active.
    /// Creation refuses to overwrite any existing log.
    pub fn writer_at(&self, role: LogRole, time: &str) -> crate::Result<CombinedWriter> {
        let meta = LogWriter::create(self.log_path(MetadataFormat::PREFIX, time, role))?;

        let eas = if self.eas {
            Some(LogWriter::create(self.log_path(EaFormat::PREFIX, time, role))?)
        } else {
            None
        };

        let acls = if self.acls {
            Some(LogWriter::create(self.log_path(AclFormat::PREFIX, time, role))?)
        } else {
            None
        };

        Ok(CombinedWriter::new(meta, eas, acls))
    }

    /// Opens the writers for a new set of logs stamped with the current
    /// wall-clock time.
    pub fn writer(&self, role: LogRole) -> crate::Result<CombinedWriter> {
        self.writer_at(role, &time::now_string())
    }

    /// Rewrites the metadata snapshot at `old_time` as a diff against
    /// the snapshot at `cur_time` and returns the new log's path.
    ///
    /// The superseded snapshot file is left in place; reclaiming its
    /// space by deleting it is the caller's decision.
    pub fn write_diff(&self, old_time: &str, cur_time: &str) -> crate::Result<PathBuf> {
        let old = self.snapshot_stream(old_time)?;
        let new = self.snapshot_stream(cur_time)?;

        let path = self.log_path(MetadataFormat::PREFIX, old_time, LogRole::Diff);
        let mut writer = LogWriter::<MetadataFormat>::create(&path)?;

        for entry in diff_entries(old, new) {
            writer.write_object(&entry?)?;
        }
        writer.close()?;

        log::debug!("wrote metadata diff {}", path.display());

        Ok(path)
    }

    fn snapshot_stream(&self, time: &str) -> crate::Result<BoxedStream<Entry>> {
        let inc = self
            .find(time, MetadataFormat::PREFIX)
            .filter(|inc| inc.role == LogRole::Snapshot)
            .ok_or_else(|| Error::MissingSnapshot(time.to_owned()))?;

        Ok(Box::new(LogReader::<MetadataFormat>::open(&inc.path)?.objects()))
    }
}
