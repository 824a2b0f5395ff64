// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Escape-quoting of path strings.
//!
//! Newlines separate the lines of a record, so a path that sits inline in
//! the line-based format must never contain a raw LF.

/// Quotes a path byte string so it fits on a single record line.
///
/// `\` becomes `\\` and LF becomes `\n`; every other byte passes through
/// unchanged. The result never contains a raw LF byte.
#[must_use]
pub fn quote(path: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(path.len());

    for &byte in path {
        match byte {
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            _ => out.push(byte),
        }
    }

    out
}

/// Reverses [`quote`].
///
/// Any other two-byte sequence starting with `\` is passed through
/// unchanged and logged.
#[must_use]
pub fn unquote(quoted: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(quoted.len());
    let mut rest = quoted;

    loop {
        match rest {
            [] => break,
            [b'\\', b'n', tail @ ..] => {
                out.push(b'\n');
                rest = tail;
            }
            [b'\\', b'\\', tail @ ..] => {
                out.push(b'\\');
                rest = tail;
            }
            [b'\\', other, tail @ ..] => {
                log::warn!(
                    "unknown quoted sequence \\{} in path",
                    char::from(*other).escape_default(),
                );
                out.push(b'\\');
                out.push(*other);
                rest = tail;
            }
            [byte, tail @ ..] => {
                out.push(*byte);
                rest = tail;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn quote_plain_path_unchanged() {
        assert_eq!(b"a/b c.txt".to_vec(), quote(b"a/b c.txt"));
    }

    #[test]
    fn quote_escapes_newline_and_backslash() {
        assert_eq!(br"weird\nname".to_vec(), quote(b"weird\nname"));
        assert_eq!(br"back\\slash".to_vec(), quote(br"back\slash"));
    }

    #[test]
    fn quoted_output_contains_no_newline() {
        let quoted = quote(b"\n\n\\\n");
        assert!(!quoted.contains(&b'\n'));
    }

    #[test]
    fn unquote_inverts_quote() {
        for path in [
            &b"plain"[..],
            b"nl\nin the middle",
            br"trailing\backslash\",
            b"\\n literal, not newline",
            b"\n",
            b"",
        ] {
            assert_eq!(path.to_vec(), unquote(&quote(path)));
        }
    }

    #[test]
    fn unknown_escape_passes_through() {
        assert_eq!(br"a\tb".to_vec(), unquote(br"a\tb"));
    }

    #[test]
    fn lone_trailing_backslash_passes_through() {
        assert_eq!(br"a\".to_vec(), unquote(br"a\"));
    }
}
