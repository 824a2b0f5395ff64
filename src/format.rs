// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{error::ParseError, index::PathIndex};
use regex::bytes::Regex;

/// Wire format of one record family stored in a flat log.
///
/// A flat log is a concatenation of textual records, each opened by a
/// marker line carrying the path token. The extractor and the log
/// reader/writer are generic over this trait, so the metadata log and
/// the sidecar logs share one streaming implementation and differ only
/// in their codec pair, boundary pattern and filename prefix.
pub trait RecordFormat {
    /// Decoded object type.
    type Object;

    /// Filename prefix of logs holding this record family.
    const PREFIX: &'static str;

    /// Pattern locating the start of a record.
    ///
    /// The whole match begins at the first byte of the record's marker
    /// line; capture group 1 holds the (possibly quoted) path token.
    fn boundary() -> &'static Regex;

    /// Encodes one object, appending its record to `out`.
    fn to_record(object: &Self::Object, out: &mut Vec<u8>);

    /// Decodes one record.
    fn to_object(record: &[u8]) -> Result<Self::Object, ParseError>;

    /// Converts a boundary path token into an index.
    #[must_use]
    fn token_to_index(token: &[u8]) -> PathIndex {
        PathIndex::from_token(token)
    }

    /// The index a decoded object sorts by.
    fn index(object: &Self::Object) -> &PathIndex;
}
