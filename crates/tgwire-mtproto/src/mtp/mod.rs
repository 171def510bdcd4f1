// Copyright 2020 - developers of the `grammers` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Implementation of the [Mobile Transport Protocol]. This layer is
//! responsible for converting zero or more input requests into outgoing
//! messages, and to process the response.
//!
//! A distinction between plain and encrypted is made for simplicity (the
//! plain hardly requires to process any state) and to help prevent invalid
//! states (encrypted communication cannot be made without an authorization
//! key).
//!
//! [Mobile Transport Protocol]: https://core.telegram.org/mtproto/description
mod encrypted;
mod plain;

pub use encrypted::{Builder, Encrypted};
pub use plain::Plain;

pub use crate::errors::{DeserializeError, RequestError};
use crate::MsgId;

/// Responses produced while deserializing a single incoming message.
pub struct Deserialization {
    /// Finished RPC results, paired with the identifier of the request
    /// message they correspond to.
    pub rpc_results: Vec<(MsgId, Result<Vec<u8>, RequestError>)>,
    /// Update bodies that were not a response to any of our requests.
    pub updates: Vec<Vec<u8>>,
}

/// The trait used by the [Mobile Transport Protocol] to serialize outgoing
/// messages and deserialize incoming ones into proper responses.
///
/// [Mobile Transport Protocol]: https://core.telegram.org/mtproto/description
pub trait Mtp {
    /// Serializes a request into the protocol's pending buffer.
    ///
    /// Returns the message ID assigned to the request, or `None` if the
    /// buffer is full and [`finalize`] should be called before enqueuing
    /// more requests.
    ///
    /// [`finalize`]: #method.finalize
    fn push(&mut self, request: &[u8]) -> Option<MsgId>;

    /// Finalizes the buffer of pending requests, returning the bytes that
    /// should be sent over the transport.
    ///
    /// The returned buffer may be empty if there was nothing to send.
    fn finalize(&mut self) -> Vec<u8>;

    /// Deserializes a single incoming message payload into zero or more
    /// responses.
    fn deserialize(&mut self, payload: &[u8]) -> Result<Deserialization, DeserializeError>;
}
