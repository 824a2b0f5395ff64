// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    acl::AclFormat, ea::EaFormat, entry::Entry, flat_file::LogWriter, record::MetadataFormat,
};

/// Fan-out writer routing one entry to up to three logs.
///
/// The metadata record is always written. The extended-attribute record
/// is written when that log is active and the entry carries a non-empty
/// set; the ACL record when that log is active and the list is not
/// already expressed by the entry's mode bits.
pub struct CombinedWriter {
    meta: LogWriter<MetadataFormat>,
    eas: Option<LogWriter<EaFormat>>,
    acls: Option<LogWriter<AclFormat>>,
}

impl CombinedWriter {
    /// Bundles a metadata writer with optional sidecar writers.
    #[must_use]
    pub fn new(
        meta: LogWriter<MetadataFormat>,
        eas: Option<LogWriter<EaFormat>>,
        acls: Option<LogWriter<AclFormat>>,
    ) -> Self {
        Self { meta, eas, acls }
    }

    /// Writes one entry to every applicable log.
    pub fn write(&mut self, entry: &Entry) -> crate::Result<()> {
        self.meta.write_object(entry)?;

        if let (Some(writer), Some(eas)) = (&mut self.eas, &entry.ea) {
            if !eas.is_empty() {
                writer.write_object(eas)?;
            }
        }

        if let (Some(writer), Some(acl)) = (&mut self.acls, &entry.acl) {
            if !acl.is_basic() {
                writer.write_object(acl)?;
            }
        }

        Ok(())
    }

    /// Closes all logs; the first failure aborts the close.
    ///
    /// Partial durability is fine here: the orchestrator refuses to mark
    /// the snapshot complete unless this returns `Ok`.
    pub fn close(self) -> crate::Result<()> {
        self.meta.close()?;

        if let Some(writer) = self.eas {
            writer.close()?;
        }
        if let Some(writer) = self.acls {
            writer.close()?;
        }

        Ok(())
    }
}
