// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    acl::AccessControlList, carbon::CarbonFile, ea::ExtendedAttributes, error::ParseError,
    index::PathIndex,
};

/// File type tag of a metadata record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FileKind {
    /// Regular file
    Regular,

    /// Directory
    Directory,

    /// Symbolic link
    Symlink,

    /// Block or character device node
    Device,

    /// Named pipe
    Fifo,

    /// Unix domain socket
    Socket,

    /// The path is absent (deleted) at this snapshot
    Tombstone,
}

impl FileKind {
    /// The wire spelling of the tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "reg",
            Self::Directory => "dir",
            Self::Symlink => "sym",
            Self::Device => "dev",
            Self::Fifo => "fifo",
            Self::Socket => "sock",
            Self::Tombstone => "None",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FileKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reg" => Ok(Self::Regular),
            "dir" => Ok(Self::Directory),
            "sym" => Ok(Self::Symlink),
            "dev" => Ok(Self::Device),
            "fifo" => Ok(Self::Fifo),
            "sock" => Ok(Self::Socket),
            "None" => Ok(Self::Tombstone),
            _ => Err(ParseError::invalid("Type", s)),
        }
    }
}

/// Block or character device.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    /// Block device (`b` on the wire)
    Block,

    /// Character device (`c` on the wire)
    Char,
}

/// Device node numbers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeviceNumbers {
    /// Block or character
    pub kind: DeviceKind,

    /// Major device number
    pub major: u64,

    /// Minor device number
    pub minor: u64,
}

/// One file's metadata as captured by a backup session.
///
/// Only `index` and `kind` are mandatory; every other field appears
/// conditionally on the file type and on what the scanning platform
/// supports. Fields that are absent stay absent across a record
/// round-trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Path index, the sort key of every log.
    pub index: PathIndex,

    /// File type tag.
    pub kind: FileKind,

    /// Size in bytes (regular files).
    pub size: Option<u64>,

    /// Raw resource fork bytes (regular files, when the platform has
    /// them). `Some` with an empty payload round-trips distinctly from
    /// absent.
    pub resource_fork: Option<Vec<u8>>,

    /// Carbon fork data (regular files, when the platform has it).
    /// The outer level is field presence; the inner level distinguishes
    /// present-but-empty from actual data.
    pub carbon: Option<Option<CarbonFile>>,

    /// Hardlink count, recorded when greater than one.
    pub nlink: Option<u64>,

    /// Filesystem inode, recorded with the hardlink count.
    pub inode: Option<u64>,

    /// Filesystem device id, recorded with the hardlink count.
    pub devloc: Option<u64>,

    /// Content hash, when known.
    pub sha1: Option<String>,

    /// Link target (symbolic links).
    pub link_target: Option<Vec<u8>>,

    /// Device numbers (device nodes).
    pub device: Option<DeviceNumbers>,

    /// Modification time, seconds since the epoch.
    pub mtime: Option<i64>,

    /// Owning user id.
    pub uid: Option<u32>,

    /// Owning user name.
    pub uname: Option<String>,

    /// Owning group id.
    pub gid: Option<u32>,

    /// Owning group name.
    pub gname: Option<String>,

    /// Permission mode bits.
    pub perms: Option<u32>,

    /// Extended attributes, stored in the sidecar log.
    pub ea: Option<ExtendedAttributes>,

    /// Access-control list, stored in the sidecar log.
    pub acl: Option<AccessControlList>,
}

impl Entry {
    /// Creates an entry with every conditional field absent.
    #[must_use]
    pub fn new(index: PathIndex, kind: FileKind) -> Self {
        Self {
            index,
            kind,
            size: None,
            resource_fork: None,
            carbon: None,
            nlink: None,
            inode: None,
            devloc: None,
            sha1: None,
            link_target: None,
            device: None,
            mtime: None,
            uid: None,
            uname: None,
            gid: None,
            gname: None,
            perms: None,
            ea: None,
            acl: None,
        }
    }

    /// Creates the record marking `index` as absent at a snapshot.
    #[must_use]
    pub fn tombstone(index: PathIndex) -> Self {
        Self::new(index, FileKind::Tombstone)
    }

    /// Returns `true` if this record marks an absent path.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.kind == FileKind::Tombstone
    }
}
