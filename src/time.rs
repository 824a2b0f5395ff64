// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Formats the current wall-clock time as a snapshot timestamp string.
///
/// The string sorts chronologically and contains neither `.` nor `/`, so
/// it can sit between the dots of an increment filename.
#[must_use]
pub fn now_string() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
