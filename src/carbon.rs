// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::error::ParseError;

/// Legacy platform fork data carried alongside a regular file.
///
/// The four fields travel as one pipe-delimited value inside the
/// metadata record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CarbonFile {
    /// Four-byte creator code.
    pub creator: [u8; 4],

    /// Four-byte type code.
    pub kind: [u8; 4],

    /// Finder location (vertical, horizontal).
    pub location: (i64, i64),

    /// Finder flags.
    pub flags: i64,
}

impl CarbonFile {
    /// Encodes the structure as a pipe-delimited field value.
    #[must_use]
    pub fn to_field(&self) -> String {
        format!(
            "creator:{}|type:{}|location:{},{}|flags:{}",
            hex::encode(self.creator),
            hex::encode(self.kind),
            self.location.0,
            self.location.1,
            self.flags,
        )
    }

    /// Decodes a pipe-delimited field value.
    ///
    /// Components may appear in any order; unknown keys are ignored.
    pub fn from_field(data: &str) -> Result<Self, ParseError> {
        let mut creator = None;
        let mut kind = None;
        let mut location = None;
        let mut flags = None;

        for component in data.split('|') {
            let Some((key, value)) = component.split_once(':') else {
                return Err(ParseError::invalid("CarbonFile", data));
            };

            match key {
                "creator" => creator = Some(decode_code(value, data)?),
                "type" => kind = Some(decode_code(value, data)?),
                "location" => {
                    let Some((a, b)) = value.split_once(',') else {
                        return Err(ParseError::invalid("CarbonFile", data));
                    };
                    let a = a
                        .parse()
                        .map_err(|_| ParseError::invalid("CarbonFile", data))?;
                    let b = b
                        .parse()
                        .map_err(|_| ParseError::invalid("CarbonFile", data))?;
                    location = Some((a, b));
                }
                "flags" => {
                    flags = Some(
                        value
                            .parse()
                            .map_err(|_| ParseError::invalid("CarbonFile", data))?,
                    );
                }
                _ => {}
            }
        }

        match (creator, kind, location, flags) {
            (Some(creator), Some(kind), Some(location), Some(flags)) => Ok(Self {
                creator,
                kind,
                location,
                flags,
            }),
            _ => Err(ParseError::invalid("CarbonFile", data)),
        }
    }
}

fn decode_code(value: &str, whole: &str) -> Result<[u8; 4], ParseError> {
    hex::decode(value)
        .ok()
        .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
        .ok_or_else(|| ParseError::invalid("CarbonFile", whole))
}
