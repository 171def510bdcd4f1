// Copyright 2020 - developers of the `grammers` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::generated::{enums, types};
use crate::session::DcOption;
use crate::storages::session_file::{self, Environment, Framing, SessionRecord};
use crate::storages::updates_file::{self, UpdatesStateRecord};
use crate::Session;
use tgwire_tl_types as tl;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::net::{SocketAddr, SocketAddrV4, SocketAddrV6};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[cfg_attr(
    feature = "impl-serde",
    derive(serde_derive::Serialize, serde_derive::Deserialize)
)]
pub struct TlSession {
    session: Mutex<types::Session>,
    /// The data center, framing and connection secrets to persist as the single
    /// JSON session record, if a connection has been established this run.
    primary: Mutex<Option<PrimaryConnection>>,
}

#[derive(Debug, Clone, Copy)]
struct PrimaryConnection {
    dc_id: i32,
    framing: Framing,
    server_salt: [u8; 8],
    session_id: [u8; 8],
}

/// Returns the sibling path the updates state is persisted under, given the
/// path the session record itself is saved to.
fn updates_state_path(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) => path.with_extension(format!("updates.{}", ext.to_string_lossy())),
        None => path.with_extension("updates"),
    }
}

/// Hardcoded known `static` options from `functions::help::GetConfig`.
pub const KNOWN_DC_OPTIONS: [types::DataCenter; 5] = [
    types::DataCenter {
        id: 1,
        ipv4: Some(i32::from_le_bytes(
            Ipv4Addr::new(149, 154, 175, 53).octets(),
        )),
        ipv6: None,
        port: 443,
        auth: None,
    },
    types::DataCenter {
        id: 2,
        ipv4: Some(i32::from_le_bytes(
            Ipv4Addr::new(149, 154, 167, 51).octets(),
        )),
        ipv6: None,
        port: 443,
        auth: None,
    },
    types::DataCenter {
        id: 3,
        ipv4: Some(i32::from_le_bytes(
            Ipv4Addr::new(149, 154, 175, 100).octets(),
        )),
        ipv6: None,
        port: 443,
        auth: None,
    },
    types::DataCenter {
        id: 4,
        ipv4: Some(i32::from_le_bytes(
            Ipv4Addr::new(149, 154, 167, 92).octets(),
        )),
        ipv6: None,
        port: 443,
        auth: None,
    },
    types::DataCenter {
        id: 5,
        ipv4: Some(i32::from_le_bytes(Ipv4Addr::new(91, 108, 56, 190).octets())),
        ipv6: None,
        port: 443,
        auth: None,
    },
];

#[allow(clippy::new_without_default)]
impl TlSession {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(types::Session {
                dcs: Vec::new(),
                user: None,
                state: None,
            }),
            primary: Mutex::new(None),
        }
    }

    /// Load a previous session instance from a file,
    /// creating one if it doesn't exist
    pub fn load_file_or_create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let session = TlSession::new();
            session.save_to_file(path)?;
            Ok(session)
        } else {
            Self::load_file(path)
        }
    }

    /// Load a previous session instance from its two on-disk JSON files: the
    /// connection record at `path`, and (if present) the updates state at its
    /// sibling `updates_state_path`.
    pub fn load_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut data = Vec::new();
        File::open(path.as_ref())?.read_to_end(&mut data)?;
        let session = Self::load(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let updates_path = updates_state_path(path.as_ref());
        if updates_path.exists() {
            let record = updates_file::load_updates_state_file(&updates_path)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            session.set_state(types::UpdateState {
                pts: record.pts,
                qts: record.qts,
                date: record.date,
                seq: record.seq,
                channels: Vec::new(),
            });
        }

        Ok(session)
    }

    /// Loads a previous session instance the same way [`TlSession::load_file`] does,
    /// additionally refusing to load if the recorded host is known to belong to the
    /// *other* network than `environment`.
    ///
    /// A host that isn't recognized as either a test or production address is not
    /// rejected: this only catches a session file saved under one environment being
    /// loaded by a runtime configured for the other.
    pub fn load_file_in_environment<P: AsRef<Path>>(
        path: P,
        environment: Environment,
    ) -> io::Result<Self> {
        let session = Self::load_file(path)?;
        if let Some(record) = session.session_record() {
            record
                .check_environment(environment)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        }
        Ok(session)
    }

    /// Loads a session record serialized as JSON, per the on-disk format
    /// documented on [`TlSession::save`].
    ///
    /// An empty JSON object (`{}`) is accepted as "no connection recorded yet"
    /// rather than being treated as malformed, so a freshly created session
    /// file round-trips through `save`/`load` before any data center has been
    /// connected to.
    pub fn load(data: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(data).map_err(|_| Error::MalformedData)?;
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|_| Error::MalformedData)?;

        if value.as_object().is_some_and(|obj| obj.is_empty()) {
            return Ok(TlSession::new());
        }

        let record = SessionRecord::from_json(&value).map_err(|e| match e {
            session_file::Error::UnsupportedVersion { .. } => Error::UnsupportedVersion,
            _ => Error::MalformedData,
        })?;

        Self::from_session_record(&record)
    }

    fn from_session_record(record: &SessionRecord) -> Result<Self, Error> {
        let ip: IpAddr = record.host.parse().map_err(|_| Error::MalformedData)?;
        let session = TlSession::new();
        session.insert_dc_tcp(
            record.dc_id,
            &SocketAddr::new(ip, record.port),
            record.auth_key,
        );
        *session.primary.lock().unwrap() = Some(PrimaryConnection {
            dc_id: record.dc_id,
            framing: record.framing,
            server_salt: record.server_salt,
            session_id: record.session_id,
        });
        Ok(session)
    }

    pub fn signed_in(&self) -> bool {
        self.session.lock().unwrap().user.is_some()
    }

    pub fn dc_auth_key(&self, dc_id: i32) -> Option<[u8; 256]> {
        self.session
            .lock()
            .unwrap()
            .dcs
            .iter()
            .filter_map(|dc| match dc {
                enums::DataCenter::Center(types::DataCenter {
                    id,
                    auth: Some(auth),
                    ..
                }) if *id == dc_id => auth.clone().try_into().ok(),
                enums::DataCenter::Ws(types::DataCenterWs {
                    id,
                    auth: Some(auth),
                    ..
                }) if *id == dc_id => auth.clone().try_into().ok(),
                _ => None,
            })
            .next()
    }

    fn insert_dc(&self, new_dc: enums::DataCenter) {
        let mut session = self.session.lock().unwrap();

        if let Some(pos) = session.dcs.iter().position(|dc| dc.id() == new_dc.id()) {
            session.dcs.remove(pos);
        }
        session.dcs.push(new_dc);
    }

    pub fn set_dc_auth_key(&self, dc_id: i32, auth: [u8; 256]) {
        let mut session = self.session.lock().unwrap();

        for dc in session.dcs.iter_mut() {
            if dc.id() == dc_id {
                match dc {
                    enums::DataCenter::Center(data_center) => data_center.auth = Some(auth.into()),
                    enums::DataCenter::Ws(data_center_ws) => {
                        data_center_ws.auth = Some(auth.into())
                    }
                }
                break;
            }
        }
    }

    pub fn insert_dc_tcp(&self, id: i32, addr: &SocketAddr, auth: [u8; 256]) {
        let (ip_v4, ip_v6): (Option<&SocketAddrV4>, Option<&SocketAddrV6>) = match addr {
            SocketAddr::V4(ip_v4) => (Some(ip_v4), None),
            SocketAddr::V6(ip_v6) => (None, Some(ip_v6)),
        };

        self.insert_dc(
            types::DataCenter {
                id,
                ipv4: ip_v4.map(|addr| i32::from_le_bytes(addr.ip().octets())),
                ipv6: ip_v6.map(|addr| addr.ip().octets()),
                port: addr.port() as i32,
                auth: Some(auth.into()),
            }
            .into(),
        );
    }

    pub fn insert_dc_ws(&self, id: i32, url: &str, auth: [u8; 256]) {
        self.insert_dc(
            types::DataCenterWs {
                id,
                url: url.to_string(),
                auth: Some(auth.into()),
            }
            .into(),
        );
    }

    pub fn set_user(&self, id: i64, dc: i32, bot: bool) {
        self.session.lock().unwrap().user = Some(types::User { id, dc, bot }.into())
    }

    /// Returns the stored user
    pub fn get_user(&self) -> Option<types::User> {
        self.session
            .lock()
            .unwrap()
            .user
            .as_ref()
            .map(|enums::User::User(user)| user.clone())
    }

    pub fn get_state(&self) -> Option<types::UpdateState> {
        let session = self.session.lock().unwrap();
        let enums::UpdateState::State(state) = session.state.clone()?;
        Some(state)
    }

    pub fn set_state(&self, state: types::UpdateState) {
        self.session.lock().unwrap().state = Some(state.into())
    }

    pub fn get_dcs(&self) -> Vec<enums::DataCenter> {
        self.session.lock().unwrap().dcs.to_vec()
    }

    /// Records which data center is the one whose connection secrets should be
    /// persisted, together with the framing and secrets negotiated for it.
    ///
    /// The data center itself must already be known (via [`TlSession::insert_dc_tcp`],
    /// [`TlSession::insert_dc_ws`] or [`Session::set_dc_option`]) for its address and
    /// authorization key to be recoverable at save time.
    pub fn set_primary(
        &self,
        dc_id: i32,
        framing: Framing,
        server_salt: [u8; 8],
        session_id: [u8; 8],
    ) {
        *self.primary.lock().unwrap() = Some(PrimaryConnection {
            dc_id,
            framing,
            server_salt,
            session_id,
        });
    }

    /// Returns the data center currently recorded as primary, if any.
    pub fn primary_dc_id(&self) -> Option<i32> {
        self.primary.lock().unwrap().as_ref().map(|p| p.dc_id)
    }

    /// Builds the on-disk [`SessionRecord`] for the primary connection, if one has
    /// been recorded and its data center's address and authorization key are known.
    fn session_record(&self) -> Option<SessionRecord> {
        let primary = *self.primary.lock().unwrap().as_ref()?;
        let option = self.dc_option(primary.dc_id)?;
        let auth_key = option.auth_key?;

        let (host, port) = if !option.ipv6.ip().is_unspecified() {
            (option.ipv6.ip().to_string(), option.ipv6.port())
        } else {
            (option.ipv4.ip().to_string(), option.ipv4.port())
        };

        Some(SessionRecord {
            dc_id: primary.dc_id,
            host,
            port,
            framing: primary.framing,
            auth_key,
            server_salt: primary.server_salt,
            session_id: primary.session_id,
        })
    }

    /// Serializes the primary connection's session record to JSON bytes, per
    /// `{version, dc_id, host, port, framing, auth_key_b64, server_salt_hex,
    /// session_id_hex}`.
    ///
    /// Returns `{}` if no primary connection has been recorded yet (or its
    /// authorization key isn't known yet), which [`TlSession::load`] accepts
    /// back as an empty session rather than a malformed one.
    #[must_use]
    pub fn save(&self) -> Vec<u8> {
        match self.session_record() {
            Some(record) => serde_json::to_vec(&record.to_json()).unwrap_or_else(|_| b"{}".to_vec()),
            None => b"{}".to_vec(),
        }
    }

    /// Saves the session to its two on-disk JSON files, atomically: the connection
    /// record at `path`, and the updates state at its sibling `updates_state_path`.
    ///
    /// Each file is written to a sibling temporary file and `fsync`'d before being
    /// renamed over the destination, so a crash or power loss cannot leave behind a
    /// truncated or partially-written file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(record) = self.session_record() {
            session_file::save_session_file(path, &record)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        } else {
            atomic_write(path, b"{}\n")?;
        }

        if let Some(state) = self.get_state() {
            updates_file::save_updates_state_file(
                updates_state_path(path),
                UpdatesStateRecord {
                    pts: state.pts,
                    qts: state.qts,
                    date: state.date,
                    seq: state.seq,
                },
            )
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        }

        Ok(())
    }
}

fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");

    let mut tmp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;
    tmp_file.write_all(contents)?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    std::fs::rename(&tmp_path, path)?;

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        // Best-effort: not every platform requires (or allows) fsyncing a directory.
        let _ = File::open(dir).and_then(|dir| dir.sync_all());
    }

    Ok(())
}

impl Session for TlSession {
    fn dc_option(&self, dc_id: i32) -> Option<DcOption> {
        let session = self.session.lock().unwrap();
        session.dcs.iter().find_map(|dc| match dc {
            enums::DataCenter::Center(types::DataCenter {
                id,
                ipv4,
                ipv6,
                port,
                auth,
            }) if *id == dc_id => Some(DcOption {
                id: *id,
                ipv4: ipv4
                    .map(|ip| SocketAddrV4::new(Ipv4Addr::from(ip.to_le_bytes()), *port as u16))
                    .unwrap_or_else(|| SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)),
                ipv6: ipv6
                    .map(|ip| SocketAddrV6::new(Ipv6Addr::from(ip), *port as u16, 0, 0))
                    .unwrap_or_else(|| SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0)),
                auth_key: auth.clone().and_then(|auth| auth.try_into().ok()),
            }),
            _ => None,
        })
    }

    fn set_dc_option(&self, option: &DcOption) {
        let ipv4 = (!option.ipv4.ip().is_unspecified())
            .then(|| i32::from_le_bytes(option.ipv4.ip().octets()));
        let ipv6 = (!option.ipv6.ip().is_unspecified()).then(|| option.ipv6.ip().octets());
        let port = if ipv6.is_some() {
            option.ipv6.port()
        } else {
            option.ipv4.port()
        };

        self.insert_dc(
            types::DataCenter {
                id: option.id,
                ipv4,
                ipv6,
                port: port as i32,
                auth: option.auth_key.map(|auth| auth.to_vec()),
            }
            .into(),
        );
    }

    fn set_user(&self, id: i64, dc: i32, bot: bool) {
        TlSession::set_user(self, id, dc, bot)
    }

    fn get_user(&self) -> Option<crate::User> {
        TlSession::get_user(self)
    }

    fn get_state(&self) -> Option<crate::UpdateState> {
        let state = TlSession::get_state(self)?;
        Some(crate::UpdateState {
            pts: state.pts,
            qts: state.qts,
            date: state.date,
            seq: state.seq,
            channels: state.channels,
        })
    }

    fn set_state(&self, state: crate::UpdateState) {
        TlSession::set_state(
            self,
            types::UpdateState {
                pts: state.pts,
                qts: state.qts,
                date: state.date,
                seq: state.seq,
                channels: state.channels,
            },
        )
    }

    fn save(&self) -> Vec<u8> {
        TlSession::save(self)
    }
}

pub fn state_to_update_state(
    tl::enums::updates::State::State(state): tl::enums::updates::State,
) -> types::UpdateState {
    types::UpdateState {
        pts: state.pts,
        qts: state.qts,
        date: state.date,
        seq: state.seq,
        channels: Vec::new(),
    }
}

pub fn try_push_channel_state(
    update_state: &mut types::UpdateState,
    channel_id: i64,
    pts: i32,
) -> bool {
    if update_state
        .channels
        .iter()
        .any(|enums::ChannelState::State(channel_state)| channel_state.channel_id == channel_id)
    {
        return false;
    }

    update_state
        .channels
        .push(enums::ChannelState::State(types::ChannelState {
            channel_id,
            pts,
        }));
    true
}

#[derive(Debug)]
pub enum Error {
    MalformedData,
    UnsupportedVersion,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedData => write!(f, "malformed data"),
            Error::UnsupportedVersion => write!(f, "unsupported version"),
        }
    }
}

impl std::error::Error for Error {}
