// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Textual codec for mirror metadata records.
//!
//! A record is a block of lines:
//!
//! ```text
//! File <quoted-path>
//!   Type reg
//!   Size 17
//!   ...
//! ```
//!
//! The format is deliberately human-readable so that decade-old logs
//! stay debuggable, and the two-space field indentation keeps record
//! boundary detection a single line-anchored pattern.

use crate::{
    carbon::CarbonFile,
    entry::{DeviceKind, DeviceNumbers, Entry, FileKind},
    error::ParseError,
    format::RecordFormat,
    index::PathIndex,
    quote::{quote, unquote},
};
use regex::bytes::Regex;
use std::sync::OnceLock;

#[allow(clippy::expect_used)]
fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();

    PATTERN.get_or_init(|| {
        Regex::new(r"(?m-u)^ *([A-Za-z0-9]+) (.+)$").expect("line pattern should compile")
    })
}

fn push_field(out: &mut Vec<u8>, name: &str, value: &[u8]) {
    out.extend_from_slice(b"  ");
    out.extend_from_slice(name.as_bytes());
    out.push(b' ');
    out.extend_from_slice(value);
    out.push(b'\n');
}

fn push_str_field(out: &mut Vec<u8>, name: &str, value: &str) {
    push_field(out, name, value.as_bytes());
}

/// Appends the record encoding of `entry` to `out`.
///
/// Field order is fixed; a record for the same entry is bit-identical
/// across versions. Tombstone records carry nothing but the type tag.
pub(crate) fn write_record(entry: &Entry, out: &mut Vec<u8>) {
    out.extend_from_slice(b"File ");
    out.extend_from_slice(&entry.index.to_token());
    out.push(b'\n');

    push_str_field(out, "Type", entry.kind.as_str());

    if entry.is_tombstone() {
        return;
    }

    if entry.kind == FileKind::Regular {
        if let Some(size) = entry.size {
            push_str_field(out, "Size", &size.to_string());
        }

        if let Some(fork) = &entry.resource_fork {
            if fork.is_empty() {
                push_str_field(out, "ResourceFork", "None");
            } else {
                push_str_field(out, "ResourceFork", &hex::encode(fork));
            }
        }

        if let Some(carbon) = &entry.carbon {
            match carbon {
                Some(cfile) => push_str_field(out, "CarbonFile", &cfile.to_field()),
                None => push_str_field(out, "CarbonFile", "None"),
            }
        }

        if let (Some(nlink), Some(inode), Some(devloc)) =
            (entry.nlink, entry.inode, entry.devloc)
        {
            if nlink > 1 {
                push_str_field(out, "NumHardLinks", &nlink.to_string());
                push_str_field(out, "Inode", &inode.to_string());
                push_str_field(out, "DeviceLoc", &devloc.to_string());
            }
        }

        if let Some(sha1) = &entry.sha1 {
            push_str_field(out, "SHA1Digest", sha1);
        }
    }

    if entry.kind == FileKind::Symlink {
        if let Some(target) = &entry.link_target {
            push_field(out, "SymData", &quote(target));
        }
    }

    if entry.kind == FileKind::Device {
        if let Some(dev) = entry.device {
            let kind = match dev.kind {
                DeviceKind::Block => "b",
                DeviceKind::Char => "c",
            };
            push_str_field(out, "DeviceNum", &format!("{kind} {} {}", dev.major, dev.minor));
        }
    }

    // Links and device nodes carry no meaningful mtime of their own
    if !matches!(entry.kind, FileKind::Symlink | FileKind::Device) {
        if let Some(mtime) = entry.mtime {
            push_str_field(out, "ModTime", &mtime.to_string());
        }
    }

    if let Some(uid) = entry.uid {
        push_str_field(out, "Uid", &uid.to_string());
    }
    push_str_field(out, "Uname", name_or_colon(entry.uname.as_deref()));
    if let Some(gid) = entry.gid {
        push_str_field(out, "Gid", &gid.to_string());
    }
    push_str_field(out, "Gname", name_or_colon(entry.gname.as_deref()));
    if let Some(perms) = entry.perms {
        push_str_field(out, "Permissions", &perms.to_string());
    }
}

fn name_or_colon(name: Option<&str>) -> &str {
    match name {
        Some(name) if !name.is_empty() => name,
        _ => ":",
    }
}

/// Decodes one record back into an [`Entry`].
///
/// Fields may arrive in any order and any subset consistent with the
/// entry's type; unknown field names are an error so that silently
/// dropping data from a future format stays impossible.
pub(crate) fn parse_record(record: &[u8]) -> Result<Entry, ParseError> {
    let mut index = None;
    let mut kind = None;
    let mut size = None;
    let mut resource_fork = None;
    let mut carbon = None;
    let mut nlink = None;
    let mut inode = None;
    let mut devloc = None;
    let mut sha1 = None;
    let mut link_target = None;
    let mut device = None;
    let mut mtime = None;
    let mut uid = None;
    let mut uname = None;
    let mut gid = None;
    let mut gname = None;
    let mut perms = None;

    for caps in line_pattern().captures_iter(record) {
        let (Some(field), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let field = field.as_bytes();
        let value = value.as_bytes();

        match field {
            b"File" => index = Some(PathIndex::from_token(value)),
            b"Type" => kind = Some(value_str("Type", value)?.parse::<FileKind>()?),
            b"Size" => size = Some(parse_num("Size", value)?),
            b"ResourceFork" => {
                resource_fork = Some(if value == b"None" {
                    Vec::new()
                } else {
                    hex::decode(value).map_err(|_| ParseError::invalid("ResourceFork", value))?
                });
            }
            b"CarbonFile" => {
                carbon = Some(if value == b"None" {
                    None
                } else {
                    Some(CarbonFile::from_field(value_str("CarbonFile", value)?)?)
                });
            }
            b"SHA1Digest" => sha1 = Some(value_str("SHA1Digest", value)?.to_owned()),
            b"NumHardLinks" => nlink = Some(parse_num("NumHardLinks", value)?),
            b"Inode" => inode = Some(parse_num("Inode", value)?),
            b"DeviceLoc" => devloc = Some(parse_num("DeviceLoc", value)?),
            b"SymData" => link_target = Some(unquote(value)),
            b"DeviceNum" => device = Some(parse_device(value)?),
            b"ModTime" => mtime = Some(parse_num("ModTime", value)?),
            b"Uid" => uid = Some(parse_num("Uid", value)?),
            b"Gid" => gid = Some(parse_num("Gid", value)?),
            b"Uname" => uname = parse_name("Uname", value)?,
            b"Gname" => gname = parse_name("Gname", value)?,
            b"Permissions" => perms = Some(parse_num("Permissions", value)?),
            other => {
                return Err(ParseError::UnknownField(
                    String::from_utf8_lossy(other).into_owned(),
                ));
            }
        }
    }

    let mut entry = Entry::new(
        index.ok_or(ParseError::MissingField("File"))?,
        kind.ok_or(ParseError::MissingField("Type"))?,
    );
    entry.size = size;
    entry.resource_fork = resource_fork;
    entry.carbon = carbon;
    entry.nlink = nlink;
    entry.inode = inode;
    entry.devloc = devloc;
    entry.sha1 = sha1;
    entry.link_target = link_target;
    entry.device = device;
    entry.mtime = mtime;
    entry.uid = uid;
    entry.uname = uname;
    entry.gid = gid;
    entry.gname = gname;
    entry.perms = perms;
    Ok(entry)
}

fn value_str<'a>(field: &'static str, value: &'a [u8]) -> Result<&'a str, ParseError> {
    std::str::from_utf8(value).map_err(|_| ParseError::invalid(field, value))
}

fn parse_num<T: std::str::FromStr>(field: &'static str, value: &[u8]) -> Result<T, ParseError> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::invalid(field, value))
}

fn parse_name(field: &'static str, value: &[u8]) -> Result<Option<String>, ParseError> {
    // `:` is the spelling of an absent name; `None` is the legacy one
    if value == b":" || value == b"None" {
        return Ok(None);
    }

    value_str(field, value).map(|s| Some(s.to_owned()))
}

fn parse_device(value: &[u8]) -> Result<DeviceNumbers, ParseError> {
    let text = value_str("DeviceNum", value)?;
    let mut parts = text.split(' ');

    let (Some(kind), Some(major), Some(minor), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::invalid("DeviceNum", value));
    };

    let kind = match kind {
        "b" => DeviceKind::Block,
        "c" => DeviceKind::Char,
        _ => return Err(ParseError::invalid("DeviceNum", value)),
    };

    Ok(DeviceNumbers {
        kind,
        major: parse_num("DeviceNum", major.as_bytes())?,
        minor: parse_num("DeviceNum", minor.as_bytes())?,
    })
}

/// Marker for the mirror metadata record family.
#[derive(Copy, Clone, Debug)]
pub struct MetadataFormat;

impl RecordFormat for MetadataFormat {
    type Object = Entry;

    const PREFIX: &'static str = "mirror_metadata";

    #[allow(clippy::expect_used)]
    fn boundary() -> &'static Regex {
        static PATTERN: OnceLock<Regex> = OnceLock::new();

        PATTERN.get_or_init(|| {
            Regex::new(r"(?m-u)^File (.*)$").expect("boundary pattern should compile")
        })
    }

    fn to_record(object: &Self::Object, out: &mut Vec<u8>) {
        write_record(object, out);
    }

    fn to_object(record: &[u8]) -> Result<Self::Object, ParseError> {
        parse_record(record)
    }

    fn index(object: &Self::Object) -> &PathIndex {
        &object.index
    }
}
