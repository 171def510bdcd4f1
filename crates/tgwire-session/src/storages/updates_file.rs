// Copyright 2020 - developers of the `grammers` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! JSON representation of the updates-stream cursor (`pts`/`qts`/`date`/`seq`),
//! persisted to a file separate from the connection-level session record so
//! that a corrupt or stale cursor never takes the authorization key down
//! with it.
//!
//! Per-channel `pts` values are not part of this file: they are re-derived by
//! calling `updates.getChannelDifference` for any channel the client cares
//! about, same as the rest of this crate's channel bookkeeping.

use snafu::prelude::*;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

const UPDATES_STATE_FILE_VERSION: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdatesStateRecord {
    pub pts: i32,
    pub qts: i32,
    pub date: i32,
    pub seq: i32,
}

impl UpdatesStateRecord {
    fn to_json(self) -> serde_json::Value {
        serde_json::json!({
            "version": UPDATES_STATE_FILE_VERSION,
            "pts": self.pts,
            "qts": self.qts,
            "date": self.date,
            "seq": self.seq,
        })
    }

    fn from_json(value: &serde_json::Value) -> Result<Self, Error> {
        let obj = value.as_object().context(NotAnObjectSnafu)?;

        let version = obj
            .get("version")
            .and_then(serde_json::Value::as_i64)
            .context(MissingFieldSnafu { field: "version" })?;
        ensure!(
            version == UPDATES_STATE_FILE_VERSION,
            UnsupportedVersionSnafu { version }
        );

        let field = |name: &'static str| -> Result<i32, Error> {
            obj.get(name)
                .and_then(serde_json::Value::as_i64)
                .map(|v| v as i32)
                .context(MissingFieldSnafu { field: name })
        };

        Ok(Self {
            pts: field("pts")?,
            qts: field("qts")?,
            date: field("date")?,
            seq: field("seq")?,
        })
    }
}

/// Loads the updates-state record from `path`.
///
/// A version mismatch refuses to load, same discipline as the session file.
pub fn load_updates_state_file(path: impl AsRef<Path>) -> Result<UpdatesStateRecord, Error> {
    let text = std::fs::read_to_string(path.as_ref()).context(IoSnafu)?;
    let value: serde_json::Value = serde_json::from_str(&text).context(DecodeJsonSnafu)?;
    UpdatesStateRecord::from_json(&value)
}

/// Saves `record` to `path`, atomically (write-to-temp, fsync, rename).
pub fn save_updates_state_file(
    path: impl AsRef<Path>,
    record: UpdatesStateRecord,
) -> Result<(), Error> {
    let path = path.as_ref();
    let tmp_path = path.with_extension("tmp");
    let text = serde_json::to_string_pretty(&record.to_json()).context(DecodeJsonSnafu)?;

    let mut tmp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)
        .context(IoSnafu)?;
    tmp_file.write_all(text.as_bytes()).context(IoSnafu)?;
    tmp_file.write_all(b"\n").context(IoSnafu)?;
    restrict_permissions(&tmp_file);
    tmp_file.sync_all().context(IoSnafu)?;
    drop(tmp_file);

    std::fs::rename(&tmp_path, path).context(IoSnafu)?;

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        let _ = std::fs::File::open(dir).and_then(|dir| dir.sync_all());
    }

    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(file: &std::fs::File) {
    use std::os::unix::fs::PermissionsExt;
    let _ = file.set_permissions(std::fs::Permissions::from_mode(0o600));
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &std::fs::File) {}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("unsupported updates-state file version {version}"))]
    UnsupportedVersion { version: i64 },
    #[snafu(display("updates-state file is missing field {field:?}"))]
    MissingField { field: &'static str },
    #[snafu(display("updates-state file is not a JSON object"))]
    NotAnObject,
    #[snafu(display("failed to parse updates-state file as JSON"))]
    DecodeJson { source: serde_json::Error },
    #[snafu(display("I/O error accessing updates-state file"))]
    Io { source: io::Error },
}
