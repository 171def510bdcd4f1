// Copyright 2020 - developers of the `grammers` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Implementation of the several [MTProto transports]. This layer is
//! responsible for taking serialized messages from the MTP and packing them
//! in a format that can be sent over a protocol, such as TCP, HTTP or UDP.
//!
//! [MTProto transports]: https://core.telegram.org/mtproto#mtproto-transport
mod abridged;
mod full;
mod intermediate;
mod obfuscated;

pub use abridged::Abridged;
pub use full::Full;
pub use intermediate::Intermediate;
pub use obfuscated::Obfuscated;
use std::fmt;

use tgwire_crypto::RingBuffer;

/// The error type reported by the different transports when something is wrong.
///
/// Certain transports will only produce certain variants of this error.
///
/// Unless the variant is `MissingBytes` or `QuickAck`, the connection should
/// not continue.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Not enough bytes are provided.
    MissingBytes,

    /// The server quickly acknowledged an earlier outbound message instead
    /// of replying to it (opt-in per message, via the high bit of its
    /// framed length). The frame carrying the acknowledgment is `len` bytes
    /// long and should simply be skipped, not treated as a failure.
    QuickAck { len: usize },

    /// The length is either too short or too long to represent a valid packet.
    BadLen { got: i32 },

    /// The sequence number received does not match the expected value.
    BadSeq { expected: i32, got: i32 },

    /// The checksum of the packet does not match its expected value.
    BadCrc { expected: u32, got: u32 },

    /// The server replied with an HTTP-like status code instead of a packet,
    /// signalling that the connection should be retried elsewhere (for
    /// example, `404` means the datacenter does not know our `auth_key_id`
    /// and a new key must be generated).
    BadStatus { status: u32 },
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport error: ")?;
        match self {
            Error::MissingBytes => write!(f, "need more bytes"),
            Error::QuickAck { len } => write!(f, "quick ack ({} bytes)", len),
            Error::BadLen { got } => write!(f, "bad len (got {})", got),
            Error::BadSeq { expected, got } => {
                write!(f, "bad seq (expected {}, got {})", expected, got)
            }
            Error::BadCrc { expected, got } => {
                write!(f, "bad crc (expected {}, got {})", expected, got)
            }
            Error::BadStatus { status } => write!(f, "bad status ({})", status),
        }
    }
}

/// The span of a single unpacked message within the buffer passed to
/// [`Transport::unpack`].
///
/// `data_start..data_end` is the payload with the transport's framing
/// stripped, while `next_offset` is where the following message (if any)
/// begins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnpackedOffset {
    pub data_start: usize,
    pub data_end: usize,
    pub next_offset: usize,
}

/// Transports whose framing starts with a fixed tag identifying the
/// transport to the server. Only these can be wrapped in [`Obfuscated`],
/// which smuggles the tag inside the encrypted random init sequence.
pub trait Tagged {
    /// Returns the tag, marking the transport as initialized so the tag is
    /// not sent again as part of the regular framing.
    fn init_tag(&mut self) -> [u8; 4];
}

/// The trait implemented by the various MTProto transports, responsible for
/// framing (and unframing) the byte stream sent over the wire.
pub trait Transport {
    /// Packs the payload currently in `buffer`, prepending whatever framing
    /// the transport requires.
    ///
    /// Panics if `buffer.len()` is not divisible by 4.
    fn pack(&mut self, buffer: &mut RingBuffer<u8>);

    /// Attempts to unpack a single message from the front of `buffer`.
    ///
    /// On success, the returned [`UnpackedOffset`] describes where the
    /// payload lies within `buffer`, and where the next message (if any)
    /// starts.
    fn unpack(&mut self, buffer: &mut [u8]) -> Result<UnpackedOffset, Error>;

    /// Resets the transport's state, as if it were newly constructed. Used
    /// after a reconnection.
    fn reset(&mut self);
}
