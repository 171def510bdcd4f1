// Copyright 2020 - developers of the `grammers` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! JSON representation of a single data center connection: the negotiated
//! authorization key, the current server salt and client session identifier,
//! and enough network information to tell whether a session file belongs to
//! the runtime's environment.

use base64::Engine;
use snafu::{Snafu, prelude::*};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

const SESSION_FILE_VERSION: i64 = 1;

/// Wire framing negotiated with the data center this record was saved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Full,
    Intermediate,
    Abridged,
}

impl Framing {
    fn as_str(self) -> &'static str {
        match self {
            Framing::Full => "full",
            Framing::Intermediate => "intermediate",
            Framing::Abridged => "abridged",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(Framing::Full),
            "intermediate" => Some(Framing::Intermediate),
            "abridged" => Some(Framing::Abridged),
            _ => None,
        }
    }
}

/// The network a recorded host is expected to belong to.
///
/// Mirrors the test/production split the original client keeps separate audit
/// tables for, so that a session file saved against one cannot silently be
/// loaded against the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Test,
    Production,
}

const TEST_HOSTS: &[&str] = &["149.154.175.10", "149.154.167.40", "149.154.175.117"];
const PROD_HOSTS: &[&str] = &[
    "149.154.175.50",
    "149.154.167.51",
    "149.154.175.100",
    "149.154.167.91",
    "91.108.56.130",
];

fn host_environment(host: &str) -> Option<Environment> {
    let host = host.trim();
    if TEST_HOSTS.contains(&host) {
        Some(Environment::Test)
    } else if PROD_HOSTS.contains(&host) {
        Some(Environment::Production)
    } else {
        None
    }
}

/// A single data center connection, as persisted to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub dc_id: i32,
    pub host: String,
    pub port: u16,
    pub framing: Framing,
    pub auth_key: [u8; 256],
    pub server_salt: [u8; 8],
    pub session_id: [u8; 8],
}

impl SessionRecord {
    pub(crate) fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "version": SESSION_FILE_VERSION,
            "dc_id": self.dc_id,
            "host": self.host,
            "port": self.port,
            "framing": self.framing.as_str(),
            "auth_key_b64": base64::engine::general_purpose::STANDARD.encode(self.auth_key),
            "server_salt_hex": hex::encode(self.server_salt),
            "session_id_hex": hex::encode(self.session_id),
        })
    }

    pub(crate) fn from_json(value: &serde_json::Value) -> Result<Self, Error> {
        let obj = value.as_object().context(NotAnObjectSnafu)?;

        let version = obj
            .get("version")
            .and_then(serde_json::Value::as_i64)
            .context(MissingFieldSnafu { field: "version" })?;
        ensure!(
            version == SESSION_FILE_VERSION,
            UnsupportedVersionSnafu { version }
        );

        let dc_id = obj
            .get("dc_id")
            .and_then(serde_json::Value::as_i64)
            .context(MissingFieldSnafu { field: "dc_id" })?;
        ensure!(dc_id > 0, BadFieldSnafu { field: "dc_id" });

        let host = obj
            .get("host")
            .and_then(serde_json::Value::as_str)
            .context(MissingFieldSnafu { field: "host" })?
            .to_string();
        ensure!(!host.is_empty(), BadFieldSnafu { field: "host" });

        let port = obj
            .get("port")
            .and_then(serde_json::Value::as_u64)
            .context(MissingFieldSnafu { field: "port" })?;
        let port: u16 = port.try_into().ok().context(BadFieldSnafu { field: "port" })?;

        let framing = obj
            .get("framing")
            .and_then(serde_json::Value::as_str)
            .and_then(Framing::parse)
            .context(BadFieldSnafu { field: "framing" })?;

        let auth_key_b64 = obj
            .get("auth_key_b64")
            .and_then(serde_json::Value::as_str)
            .context(MissingFieldSnafu { field: "auth_key_b64" })?;
        let auth_key_bytes = base64::engine::general_purpose::STANDARD
            .decode(auth_key_b64)
            .context(DecodeBase64Snafu)?;
        let auth_key: [u8; 256] = auth_key_bytes
            .try_into()
            .ok()
            .context(BadFieldSnafu { field: "auth_key_b64" })?;

        let server_salt_hex = obj
            .get("server_salt_hex")
            .and_then(serde_json::Value::as_str)
            .context(MissingFieldSnafu { field: "server_salt_hex" })?;
        let server_salt = decode_hex8(server_salt_hex, "server_salt_hex")?;

        let session_id_hex = obj
            .get("session_id_hex")
            .and_then(serde_json::Value::as_str)
            .context(MissingFieldSnafu { field: "session_id_hex" })?;
        let session_id = decode_hex8(session_id_hex, "session_id_hex")?;

        Ok(SessionRecord {
            dc_id: dc_id as i32,
            host,
            port,
            framing,
            auth_key,
            server_salt,
            session_id,
        })
    }

    /// Returns an error if `host` is recognized as belonging to the other network.
    ///
    /// An unrecognized host (neither a known test nor production address) is not
    /// treated as a mismatch: this check only catches the case where a session is
    /// known to have been saved under one environment and loaded under the other.
    pub fn check_environment(&self, expected: Environment) -> Result<(), Error> {
        if let Some(actual) = host_environment(&self.host) {
            ensure!(
                actual == expected,
                NetworkMismatchSnafu {
                    host: self.host.clone()
                }
            );
        }
        Ok(())
    }
}

fn decode_hex8(s: &str, field: &'static str) -> Result<[u8; 8], Error> {
    let bytes = hex::decode(s).ok().context(BadFieldSnafu { field })?;
    bytes.try_into().ok().context(BadFieldSnafu { field })
}

/// Loads a session record from `path`.
///
/// A version mismatch (or any other malformed field) refuses to load entirely,
/// rather than attempting to recover a partial record.
pub fn load_session_file(path: impl AsRef<Path>) -> Result<SessionRecord, Error> {
    let text = std::fs::read_to_string(path.as_ref()).context(IoSnafu)?;
    let value: serde_json::Value = serde_json::from_str(&text).context(DecodeJsonSnafu)?;
    SessionRecord::from_json(&value)
}

/// Saves `record` to `path`, atomically.
///
/// The new contents are written to a sibling temporary file and `fsync`'d
/// before being renamed over the destination, and given restrictive
/// permissions where the platform supports them.
pub fn save_session_file(path: impl AsRef<Path>, record: &SessionRecord) -> Result<(), Error> {
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
        // Best-effort: not every platform requires (or allows) fsyncing a directory.
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
    #[snafu(display("unsupported session file version {version}"))]
    UnsupportedVersion { version: i64 },
    #[snafu(display("session file is missing field {field:?}"))]
    MissingField { field: &'static str },
    #[snafu(display("session file has an invalid value for field {field:?}"))]
    BadField { field: &'static str },
    #[snafu(display("session file is not a JSON object"))]
    NotAnObject,
    #[snafu(display("failed to parse session file as JSON"))]
    DecodeJson { source: serde_json::Error },
    #[snafu(display("failed to decode auth_key_b64"))]
    DecodeBase64 { source: base64::DecodeError },
    #[snafu(display(
        "session file host {host:?} does not belong to the runtime's environment"
    ))]
    NetworkMismatch { host: String },
    #[snafu(display("I/O error accessing session file"))]
    Io { source: io::Error },
}
