// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{error::ParseError, format::RecordFormat, index::PathIndex};
use regex::bytes::Regex;
use std::sync::OnceLock;

/// Who one access-control entry applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AclTag {
    /// The owning user (`user::` on the wire)
    UserObj,

    /// A named user, by name or numeric id
    User(String),

    /// The owning group (`group::`)
    GroupObj,

    /// A named group, by name or numeric id
    Group(String),

    /// The effective rights mask (`mask::`)
    Mask,

    /// Everyone else (`other::`)
    Other,
}

/// One access-control entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AclEntry {
    /// Who the entry applies to.
    pub tag: AclTag,

    /// Permission bits, `r = 4`, `w = 2`, `x = 1`.
    pub perms: u8,
}

impl AclEntry {
    fn write_line(&self, out: &mut String) {
        match &self.tag {
            AclTag::UserObj => out.push_str("user:"),
            AclTag::User(name) => {
                out.push_str("user:");
                out.push_str(name);
            }
            AclTag::GroupObj => out.push_str("group:"),
            AclTag::Group(name) => {
                out.push_str("group:");
                out.push_str(name);
            }
            AclTag::Mask => out.push_str("mask:"),
            AclTag::Other => out.push_str("other:"),
        }

        out.push(':');
        out.push(if self.perms & 4 == 0 { '-' } else { 'r' });
        out.push(if self.perms & 2 == 0 { '-' } else { 'w' });
        out.push(if self.perms & 1 == 0 { '-' } else { 'x' });
        out.push('\n');
    }

    fn parse_line(line: &str) -> Result<Self, ParseError> {
        let mut parts = line.splitn(3, ':');

        let (Some(tag), Some(qualifier), Some(perms)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseError::invalid("acl entry", line));
        };

        let tag = match (tag, qualifier) {
            ("user", "") => AclTag::UserObj,
            ("user", name) => AclTag::User(name.to_owned()),
            ("group", "") => AclTag::GroupObj,
            ("group", name) => AclTag::Group(name.to_owned()),
            ("mask", "") => AclTag::Mask,
            ("other", "") => AclTag::Other,
            _ => return Err(ParseError::invalid("acl entry", line)),
        };

        let perms = match perms.as_bytes() {
            [r @ (b'r' | b'-'), w @ (b'w' | b'-'), x @ (b'x' | b'-')] => {
                u8::from(*r == b'r') * 4 + u8::from(*w == b'w') * 2 + u8::from(*x == b'x')
            }
            _ => return Err(ParseError::invalid("acl entry", line)),
        };

        Ok(Self { tag, perms })
    }
}

/// Access-control list of one file.
///
/// Access entries mirror `getfacl` lines; default entries are the ones
/// a directory hands down, spelled with a `default:` prefix. A *basic*
/// list is one the permission bits of the metadata record already
/// express, so writing it to the sidecar log would be redundant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessControlList {
    /// Index of the file the list belongs to.
    pub index: PathIndex,

    /// Access entries.
    pub entries: Vec<AclEntry>,

    /// Default entries (directories only).
    pub default_entries: Vec<AclEntry>,
}

impl AccessControlList {
    /// Creates an empty list for `index`.
    #[must_use]
    pub fn new(index: PathIndex) -> Self {
        Self {
            index,
            entries: Vec::new(),
            default_entries: Vec::new(),
        }
    }

    /// Returns `true` if the list is expressible by mode bits alone:
    /// no named entries, no mask, no default entries.
    #[must_use]
    pub fn is_basic(&self) -> bool {
        self.default_entries.is_empty()
            && self
                .entries
                .iter()
                .all(|entry| matches!(entry.tag, AclTag::UserObj | AclTag::GroupObj | AclTag::Other))
    }

    pub(crate) fn write_record(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"# file: ");
        out.extend_from_slice(&self.index.to_token());
        out.push(b'\n');

        let mut text = String::new();

        for entry in &self.entries {
            entry.write_line(&mut text);
        }
        for entry in &self.default_entries {
            text.push_str("default:");
            entry.write_line(&mut text);
        }

        out.extend_from_slice(text.as_bytes());
    }

    pub(crate) fn parse(record: &[u8]) -> Result<Self, ParseError> {
        let mut lines = record.split(|byte| *byte == b'\n');

        let index = lines
            .next()
            .and_then(|line| line.strip_prefix(b"# file: "))
            .map(PathIndex::from_token)
            .ok_or(ParseError::MissingField("# file"))?;

        let mut acl = Self::new(index);

        for line in lines {
            if line.is_empty() {
                continue;
            }

            let line =
                std::str::from_utf8(line).map_err(|_| ParseError::invalid("acl entry", line))?;

            if let Some(rest) = line.strip_prefix("default:") {
                acl.default_entries.push(AclEntry::parse_line(rest)?);
            } else {
                acl.entries.push(AclEntry::parse_line(line)?);
            }
        }

        Ok(acl)
    }
}

/// Marker for the access-control-list record family.
#[derive(Copy, Clone, Debug)]
pub struct AclFormat;

impl RecordFormat for AclFormat {
    type Object = AccessControlList;

    const PREFIX: &'static str = "access_control_lists";

    #[allow(clippy::expect_used)]
    fn boundary() -> &'static Regex {
        static PATTERN: OnceLock<Regex> = OnceLock::new();

        PATTERN.get_or_init(|| {
            Regex::new(r"(?m-u)^# file: (.*)$").expect("boundary pattern should compile")
        })
    }

    fn to_record(object: &Self::Object, out: &mut Vec<u8>) {
        object.write_record(out);
    }

    fn to_object(record: &[u8]) -> Result<Self::Object, ParseError> {
        AccessControlList::parse(record)
    }

    fn index(object: &Self::Object) -> &PathIndex {
        &object.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn extended() -> AccessControlList {
        let mut acl = AccessControlList::new(PathIndex::from(["srv", "shared"]));
        acl.entries = vec![
            AclEntry {
                tag: AclTag::UserObj,
                perms: 7,
            },
            AclEntry {
                tag: AclTag::User("alice".into()),
                perms: 5,
            },
            AclEntry {
                tag: AclTag::GroupObj,
                perms: 5,
            },
            AclEntry {
                tag: AclTag::Mask,
                perms: 5,
            },
            AclEntry {
                tag: AclTag::Other,
                perms: 0,
            },
        ];
        acl.default_entries = vec![AclEntry {
            tag: AclTag::Group("backup".into()),
            perms: 4,
        }];
        acl
    }

    #[test]
    fn record_round_trip() {
        let acl = extended();

        let mut buf = Vec::new();
        acl.write_record(&mut buf);

        assert_eq!(Ok(acl), AccessControlList::parse(&buf));
    }

    #[test]
    fn record_encoding_is_stable() {
        let mut buf = Vec::new();
        extended().write_record(&mut buf);

        assert_eq!(
            "# file: srv/shared\nuser::rwx\nuser:alice:r-x\ngroup::r-x\nmask::r-x\n\
             other::---\ndefault:group:backup:r--\n",
            String::from_utf8_lossy(&buf),
        );
    }

    #[test]
    fn basic_list_detection() {
        let mut acl = AccessControlList::new(PathIndex::from(["plain"]));
        acl.entries = vec![
            AclEntry {
                tag: AclTag::UserObj,
                perms: 6,
            },
            AclEntry {
                tag: AclTag::GroupObj,
                perms: 4,
            },
            AclEntry {
                tag: AclTag::Other,
                perms: 4,
            },
        ];
        assert!(acl.is_basic());

        acl.entries.push(AclEntry {
            tag: AclTag::User("bob".into()),
            perms: 6,
        });
        assert!(!acl.is_basic());

        assert!(!extended().is_basic());
    }

    #[test]
    fn malformed_perms_are_rejected() {
        assert!(AccessControlList::parse(b"# file: x\nuser::rwxs\n").is_err());
        assert!(AccessControlList::parse(b"# file: x\nuser::wrx\n").is_err());
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(AccessControlList::parse(b"# file: x\nflags::rwx\n").is_err());
    }
}
