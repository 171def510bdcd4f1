// Copyright 2020 - developers of the `grammers` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
#[cfg(test)]
use super::tests::Instant;
use tgwire_tl_types as tl;
use std::time::Duration;
#[cfg(not(test))]
use web_time::Instant;

/// Telegram sends `seq` equal to `0` when "it doesn't matter", so we use that value too.
pub(super) const NO_SEQ: i32 = 0;

/// It has been observed that Telegram may send updates with `qts` equal to `0` (for
/// example with `ChannelParticipant`), interleaved with non-zero `qts` values. This
/// presumably means that the ordering should be "ignored" in that case.
///
/// One can speculate this is done because the field is not optional in the TL definition.
///
/// Not ignoring the `pts` information in those updates can lead to failures resolving gaps.
pub(super) const NO_PTS: i32 = 0;

/// Non-update types like `messages.affectedMessages` can contain `pts` that should still be
/// processed. Because there's no `date`, a value of `0` is used as the sentinel value for
/// the `date` when constructing the dummy `Updates` (in order to handle them uniformly).
pub(super) const NO_DATE: i32 = 0;

// > It may be useful to wait up to 0.5 seconds
pub(super) const POSSIBLE_GAP_TIMEOUT: Duration = Duration::from_millis(500);

/// After how long without updates the client will "timeout".
///
/// When this timeout occurs, the client will attempt to fetch updates by itself, ignoring all the
/// updates that arrive in the meantime. After all updates are fetched when this happens, the
/// client will resume normal operation, and the timeout will reset.
///
/// Documentation recommends 15 minutes without updates (https://core.telegram.org/api/updates).
pub(super) const NO_UPDATES_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Identifies one of the independently-tracked update streams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Entry {
    /// The account-wide `pts`. Private conversations and small group chats.
    AccountWide,
    /// The account-wide `qts`. Secret chats and certain bot-only updates.
    SecretChats,
    /// A channel-specific `pts`, keyed by the channel's id.
    Channel(i64),
}

/// Per-entry tracked state.
#[derive(Debug, Clone, Copy)]
pub(super) struct State {
    pub(super) pts: i32,
    pub(super) deadline: Instant,
}

/// Represents the information needed to correctly handle a specific `tl::enums::Update`.
#[derive(Debug)]
pub(super) struct PtsInfo {
    pub(super) pts: i32,
    pub(super) pts_count: i32,
    pub(super) entry: Entry,
}

// > ### Recovering gaps
// > […] Manually obtaining updates is also required in the following situations:
// > • Loss of sync: a gap was found in `seq` / `pts` / `qts` (as described above).
// >   It may be useful to wait up to 0.5 seconds in this situation and abort the sync in case a new update
// >   arrives, that fills the gap.
//
// This is really easy to trigger by spamming messages in a channel (with as little as 3 members works), because
// the updates produced by the RPC request take a while to arrive (whereas the read update comes faster alone).
#[derive(Debug)]
pub(super) struct PossibleGap {
    pub(super) deadline: Instant,
    /// Pending updates (those with a larger PTS, producing the gap which may later be filled).
    pub(super) updates: Vec<tl::enums::Update>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Gap;

/// Anything that should be treated like an update.
#[derive(Debug)]
pub enum UpdatesLike {
    Updates(tl::enums::Updates),
    ShortSentMessage {
        request: tl::functions::messages::SendMessage,
        update: tl::types::UpdateShortSentMessage,
    },
    AffectedMessages(tl::types::messages::AffectedMessages),
    InvitedUsers(tl::types::messages::InvitedUsers),
    /// Not an update sent by Telegram, but still something that affects handling of updates.
    /// The caller should getDifference and query the server for any possibly-lost updates.
    Reconnection,
}

/// Contains all live entries (account-wide, secret chats, per-channel) and is able to process
/// incoming updates for each of them, detecting gaps and driving resync.
///
/// See <https://core.telegram.org/api/updates#message-related-event-sequences>.
#[derive(Debug)]
pub struct MessageBox {
    pub(super) map: std::collections::HashMap<Entry, State>,
    pub(super) date: i32,
    pub(super) seq: i32,
    pub(super) possible_gaps: std::collections::HashMap<Entry, PossibleGap>,
    pub(super) getting_diff_for: std::collections::HashSet<Entry>,
    pub(super) next_deadline: Option<Entry>,
    pub(super) tmp_entries: std::collections::HashSet<Entry>,
}
