// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    error::ParseError,
    format::RecordFormat,
    index::PathIndex,
    quote::{quote, unquote},
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use regex::bytes::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Extended attributes of one file, keyed by attribute name.
///
/// Stored in the `extended_attributes` sidecar log and joined back onto
/// the metadata stream by index. Values are raw bytes; on the wire they
/// are base64 behind the `0s` marker, the spelling `getfattr` dumps use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedAttributes {
    /// Index of the file the attributes belong to.
    pub index: PathIndex,

    /// Attribute name to raw value, sorted by name.
    pub attrs: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl ExtendedAttributes {
    /// Creates an empty attribute set for `index`.
    #[must_use]
    pub fn new(index: PathIndex) -> Self {
        Self {
            index,
            attrs: BTreeMap::new(),
        }
    }

    /// Inserts one attribute.
    pub fn set(&mut self, name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Returns `true` if no attributes are present.
    ///
    /// Empty sets are not written to the sidecar log.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub(crate) fn write_record(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"# file: ");
        out.extend_from_slice(&self.index.to_token());
        out.push(b'\n');

        for (name, value) in &self.attrs {
            out.extend_from_slice(&quote(name));
            out.extend_from_slice(b"=0s");
            out.extend_from_slice(BASE64.encode(value).as_bytes());
            out.push(b'\n');
        }
    }

    pub(crate) fn parse(record: &[u8]) -> Result<Self, ParseError> {
        let mut lines = record.split(|byte| *byte == b'\n');

        let index = lines
            .next()
            .and_then(|line| line.strip_prefix(b"# file: "))
            .map(PathIndex::from_token)
            .ok_or(ParseError::MissingField("# file"))?;

        let mut attrs = BTreeMap::new();

        for line in lines {
            if line.is_empty() {
                continue;
            }

            let pos = line
                .iter()
                .position(|byte| *byte == b'=')
                .ok_or_else(|| ParseError::invalid("attribute", line))?;
            let (name, rest) = line.split_at(pos);

            let value = rest
                .strip_prefix(b"=0s")
                .and_then(|encoded| BASE64.decode(encoded).ok())
                .ok_or_else(|| ParseError::invalid("attribute", line))?;

            attrs.insert(unquote(name), value);
        }

        Ok(Self { index, attrs })
    }
}

/// Marker for the extended-attributes record family.
#[derive(Copy, Clone, Debug)]
pub struct EaFormat;

impl RecordFormat for EaFormat {
    type Object = ExtendedAttributes;

    const PREFIX: &'static str = "extended_attributes";

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
        ExtendedAttributes::parse(record)
    }

    fn index(object: &Self::Object) -> &PathIndex {
        &object.index
    }
}
