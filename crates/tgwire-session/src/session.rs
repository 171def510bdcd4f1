// Copyright 2020 - developers of the `grammers` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::net::{SocketAddrV4, SocketAddrV6};

/// Re-exported so callers of [`Session`] do not need to depend on the generated schema module
/// to describe a channel's persisted `pts` value.
pub use crate::generated::types::ChannelState;

/// A data center the session knows how to reach, together with the authorization key
/// negotiated with it (if any). Unlike [`crate::BootstrapDcOption`], this is discovered
/// and updated at runtime: first from `help.getConfig`, later with the `auth_key` obtained
/// after a successful key exchange.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DcOption {
    pub id: i32,
    pub ipv4: SocketAddrV4,
    pub ipv6: SocketAddrV6,
    pub auth_key: Option<[u8; 256]>,
}

/// Full updates state, as it should be persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateState {
    pub pts: i32,
    pub qts: i32,
    pub date: i32,
    pub seq: i32,
    pub channels: Vec<crate::generated::enums::ChannelState>,
}

/// Coarse updates state, omitting per-channel `pts` values.
///
/// Useful for callers that only care about whether any updates have been missed at all,
/// without needing the full per-channel breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdatesState {
    pub pts: i32,
    pub qts: i32,
    pub date: i32,
    pub seq: i32,
}

impl From<&UpdateState> for UpdatesState {
    fn from(state: &UpdateState) -> Self {
        Self {
            pts: state.pts,
            qts: state.qts,
            date: state.date,
            seq: state.seq,
        }
    }
}

/// The trait used by session implementations.
///
/// The creation and loading of sessions is left up to each concrete
/// implementation, since they may choose different ways of being loaded.
///
/// All methods take `&self` rather than `&mut self`: a session is shared (typically
/// through an `Arc`) between the task driving the sender pool and whichever task is
/// invoking requests, so implementations are expected to use interior mutability
/// (e.g. a `Mutex`) to stay `Send + Sync`.
pub trait Session: Send + Sync {
    /// Return the known address and authorization key for the given data center, if any.
    fn dc_option(&self, dc_id: i32) -> Option<DcOption>;

    /// Record (or update) a data center's address and/or authorization key.
    fn set_dc_option(&self, option: &DcOption);

    /// Save the signed-in user.
    fn set_user(&self, id: i64, dc: i32, bot: bool);

    /// Return the signed-in user, if any.
    fn get_user(&self) -> Option<crate::User>;

    /// Return the last persisted updates state, if any.
    fn get_state(&self) -> Option<UpdateState>;

    /// Persist the updates state.
    fn set_state(&self, state: UpdateState);

    /// Serialize the entire session to bytes suitable for storage.
    fn save(&self) -> Vec<u8>;
}
