// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::path::PathBuf;

/// Error during record decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A field name that is not part of the record schema
    UnknownField(String),

    /// A field value that could not be decoded
    InvalidValue {
        /// Name of the offending field
        field: &'static str,
        /// The raw value, lossily decoded for display
        value: String,
    },

    /// A mandatory record line is missing
    MissingField(&'static str),
}

impl ParseError {
    pub(crate) fn invalid(field: &'static str, value: impl AsRef<[u8]>) -> Self {
        Self::InvalidValue {
            field,
            value: String::from_utf8_lossy(value.as_ref()).into_owned(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField(name) => write!(f, "unknown field {name:?}"),
            Self::InvalidValue { field, value } => {
                write!(f, "invalid {field} value {value:?}")
            }
            Self::MissingField(field) => write!(f, "missing {field} line"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Represents errors that can occur in the metadata store
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// A record could not be parsed
    Parse(ParseError),

    /// Refused to overwrite an existing log file
    AlreadyExists(PathBuf),

    /// No metadata snapshot is recorded at the given time
    MissingSnapshot(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MetaStoreError: {self:?}")
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::AlreadyExists(_) | Self::MissingSnapshot(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ParseError> for Error {
    fn from(value: ParseError) -> Self {
        Self::Parse(value)
    }
}

/// Store result
pub type Result<T> = std::result::Result<T, Error>;
