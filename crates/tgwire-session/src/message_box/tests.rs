// Copyright 2020 - developers of the `grammers` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::{ChatHashCache, MessageBox};
use crate::UpdateState;
use tgwire_tl_types as tl;
use std::cell::RefCell;
use std::ops::Add;
use std::time::Duration;

thread_local! {
    static NOW: RefCell<Instant> = RefCell::new(Instant(Duration::ZERO));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(Duration);

impl Instant {
    pub fn now() -> Self {
        NOW.with_borrow(|now| *now)
    }
}

impl Add<Duration> for Instant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs)
    }
}

fn updates_state(date: i32, seq: i32, pts: i32, qts: i32) -> tl::enums::updates::State {
    tl::enums::updates::State::State(tl::types::updates::State {
        pts,
        qts,
        date,
        seq,
        unread_count: 0,
    })
}

fn delete_messages(pts: i32, pts_count: i32) -> tl::enums::Update {
    tl::enums::Update::DeleteMessages(tl::types::UpdateDeleteMessages {
        messages: Vec::new(),
        pts,
        pts_count,
    })
}

fn wrap(update: tl::enums::Update, date: i32, seq: i32) -> tl::enums::Updates {
    tl::enums::Updates::Updates(tl::types::Updates {
        updates: vec![update],
        users: Vec::new(),
        chats: Vec::new(),
        date,
        seq,
    })
}

#[test]
fn new_message_box_is_empty() {
    let message_box = MessageBox::new();
    assert!(message_box.is_empty());
}

#[test]
fn loaded_message_box_round_trips_session_state() {
    let original = UpdateState {
        pts: 100,
        qts: 0,
        date: 1_700_000_000,
        seq: 0,
        channels: Vec::new(),
    };
    let message_box = MessageBox::load(original.clone());
    assert!(!message_box.is_empty());
    let recovered = message_box.session_state();
    assert_eq!(recovered.pts, original.pts);
    assert_eq!(recovered.qts, original.qts);
    assert_eq!(recovered.date, original.date);
    assert_eq!(recovered.seq, original.seq);
}

#[test]
fn in_order_update_is_applied_without_gap() {
    let mut message_box = MessageBox::load(UpdateState {
        pts: 100,
        qts: 0,
        date: 1_700_000_000,
        seq: 0,
        channels: Vec::new(),
    });
    let chat_hashes = ChatHashCache::new(None);

    let updates = wrap(delete_messages(101, 1), 1_700_000_005, 1);
    let (applied, _users, _chats) = message_box
        .process_updates(updates, &chat_hashes)
        .expect("in-order update should not be a gap");

    assert_eq!(applied.len(), 1);
    assert_eq!(message_box.session_state().pts, 101);
}

#[test]
fn out_of_order_pts_is_reported_as_a_gap() {
    let mut message_box = MessageBox::load(UpdateState {
        pts: 100,
        qts: 0,
        date: 1_700_000_000,
        seq: 0,
        channels: Vec::new(),
    });
    let chat_hashes = ChatHashCache::new(None);

    // expected pts would be 101; 103 leaves a hole.
    let updates = wrap(delete_messages(103, 1), 1_700_000_005, 1);
    let result = message_box.process_updates(updates, &chat_hashes);

    assert!(result.is_err());
    let difference_request = message_box
        .get_difference()
        .expect("a gap must request getDifference");
    assert_eq!(difference_request.pts, 100);
}

#[test]
fn applying_empty_difference_advances_date_and_seq() {
    let mut message_box = MessageBox::load(UpdateState {
        pts: 100,
        qts: 0,
        date: 1_700_000_000,
        seq: 0,
        channels: Vec::new(),
    });
    let mut chat_hashes = ChatHashCache::new(None);

    let updates = wrap(delete_messages(103, 1), 1_700_000_005, 1);
    message_box
        .process_updates(updates, &chat_hashes)
        .unwrap_err();
    assert!(message_box.get_difference().is_some());

    let difference = tl::enums::updates::Difference::Empty(tl::types::updates::DifferenceEmpty {
        date: 1_700_000_010,
        seq: 1,
    });
    let (applied, _users, _chats) = message_box.apply_difference(difference, &mut chat_hashes);

    assert!(applied.is_empty());
    let state = message_box.session_state();
    assert_eq!(state.date, 1_700_000_010);
    assert_eq!(state.seq, 1);
    // pts should be unchanged by an empty difference, no new message was applied.
    assert_eq!(state.pts, 100);
}

#[test]
fn set_state_overwrites_pts_qts_date_seq() {
    let mut message_box = MessageBox::new();
    message_box.set_state(updates_state(42, 7, 55, 3));
    let state = message_box.session_state();
    assert_eq!(state.pts, 55);
    assert_eq!(state.qts, 3);
    assert_eq!(state.date, 42);
    assert_eq!(state.seq, 7);
}

#[test]
fn channel_state_is_tracked_independently() {
    let mut message_box = MessageBox::new();
    message_box.try_set_channel_state(1000, 10);
    // A second call for the same channel must not panic or duplicate the entry.
    message_box.try_set_channel_state(1000, 10);
    let state = message_box.session_state();
    assert_eq!(state.channels.len(), 1);
}
