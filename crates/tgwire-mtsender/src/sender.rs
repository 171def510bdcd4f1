// Copyright 2020 - developers of the `grammers` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The [`Sender`] drives a single MTProto connection: it owns the socket,
//! frames outgoing/incoming data through a [`Transport`], and multiplexes
//! pending RPCs and update notifications through a [`Mtp`] implementation.
use crate::errors::{AuthorizationError, InvocationError, ReadError, RpcError};
use crate::net::{NetStream, ServerAddr};
use crate::reconnection::ReconnectionPolicy;
use futures_util::future::{select, Either};
use log::{debug, info, warn};
use std::io;
use std::pin::pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tgwire_crypto::RingBuffer;
use tgwire_mtproto::errors::RequestError;
use tgwire_mtproto::mtp::{self, Mtp};
use tgwire_mtproto::transport::Transport;
use tgwire_mtproto::{authentication, MsgId};
use tgwire_session::UpdatesLike;
use tgwire_tl_types::{self as tl, Deserializable, RemoteCall, Serializable};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use web_time::Instant;

/// Maximum data that may be in the buffers before the connection is torn
/// down. A malicious or misbehaving server should not be able to make us
/// grow these indefinitely.
const MAXIMUM_DATA: usize = (1024 * 1024) + (8 * 1024);

/// Extra room reserved at the front of the write buffer so that
/// `Transport::pack` can prepend its framing in place, without having to
/// shift the whole payload around. Large enough for every transport this
/// crate ships (`Full`'s 8-byte header is the widest).
const LEADING_BUFFER_SPACE: usize = 32;

const PING_DELAY: Duration = Duration::from_secs(60);
const NO_PING_DISCONNECT: i32 = 75;

/// Bad-message error codes that are transient and self-corrected by the
/// `Mtp` layer (time offset resync, sequence bump, salt update): the
/// request is resent with a fresh `msg_id`.
const BAD_MSG_RETRYABLE: [i32; 3] = [16, 17, 48];

/// Bad-message error codes that are logged but neither retried nor
/// considered fatal for the specific call: the counters resynchronize on
/// their own and the call is left pending.
const BAD_MSG_IGNORED: [i32; 2] = [32, 33];

/// Safety cap on how many times a single request may be resent after a
/// retryable bad-message notification, so a misbehaving server can't stall
/// a call forever.
const MAX_BAD_MSG_RETRIES: u32 = 10;

/// Names of RPC errors that instruct the client to back off and retry.
const FLOOD_ERROR_NAMES: [&str; 3] = ["FLOOD_WAIT", "SLOWMODE_WAIT", "FLOOD_PREMIUM_WAIT"];

/// Upper bound on how long we're willing to sleep for a flood-wait before
/// giving up and surfacing the error to the caller instead.
const MAX_FLOOD_WAIT_SECS: u32 = 60;

/// Upper bound on how many times a single call may be retried after a
/// flood-wait style error.
const MAX_FLOOD_RETRIES: u32 = 3;

/// Upper bound on how many times the `set_client_dh_params` exchange may be
/// retried after a `dh_gen_retry` answer, so a misbehaving server can't hang
/// the handshake forever.
const MAX_DH_GEN_RETRIES: u32 = 5;

/// Conservative default for how many consecutive quick-ack frames
/// (`tgwire_mtproto::transport::Error::QuickAck`) are tolerated before the
/// connection is considered stuck and torn down, rather than hardcoding the
/// cap as a constant a caller has no way to adjust.
const DEFAULT_QUICK_ACK_TOLERANCE: usize = 16;

fn generate_random_id() -> i64 {
    static ID_COUNTER: AtomicI64 = AtomicI64::new(0);

    let mut id = ID_COUNTER.load(Ordering::SeqCst);
    if id == 0 {
        id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos() as i64;
    }
    ID_COUNTER
        .compare_exchange(0, id, Ordering::SeqCst, Ordering::SeqCst)
        .ok();
    ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Human-readable description of a `bad_msg_notification` error code,
/// adapted from [Service Messages about Messages].
///
/// [Service Messages about Messages]: https://core.telegram.org/mtproto/service_messages_about_messages
fn bad_message_description(code: i32) -> &'static str {
    match code {
        16 => "msg_id too low",
        17 => "msg_id too high",
        18 => "incorrect two lower order msg_id bits; this is a bug",
        19 => "container msg_id is the same as msg_id of a previously received message; this is a bug",
        20 => "message too old",
        32 => "msg_seqno too low",
        33 => "msg_seqno too high",
        34 => "an even msg_seqno expected; this may be a bug",
        35 => "odd msg_seqno expected; this may be a bug",
        48 => "incorrect server salt",
        64 => "invalid container; this is likely a bug",
        _ => "unknown explanation; please report this issue",
    }
}

fn constructor_id(body: &[u8]) -> Option<u32> {
    body.get(..4)
        .map(|b| u32::from_le_bytes(b.try_into().unwrap()))
}

/// Parses the seconds argument out of a `FLOOD_WAIT`-like RPC error name,
/// returning `None` if the error is not one of the retry-on-backoff kind.
fn flood_wait_seconds(error: &RpcError) -> Option<u32> {
    if FLOOD_ERROR_NAMES.iter().any(|name| error.is(name)) {
        error.value
    } else {
        None
    }
}

/// The state of a single pending request's message within the `Mtp` layer.
#[derive(Debug, Clone, Copy)]
enum RequestState {
    /// Not yet handed to the `Mtp` layer.
    NotSerialized,
    /// Handed to `Mtp::push`, waiting to be flushed to the socket.
    Serialized(MsgId),
    /// Flushed to the socket, waiting for a response.
    Sent(MsgId),
    /// Waiting out a server-requested back-off before being resent.
    Waiting { until: Instant },
}

struct Request {
    body: Vec<u8>,
    state: RequestState,
    result: oneshot::Sender<Result<Vec<u8>, InvocationError>>,
    bad_msg_retries: u32,
    flood_retries: u32,
}

/// A request body paired with the channel its result should be delivered
/// through, submitted via an [`Enqueuer`] from outside the task driving
/// [`Sender::step`].
type QueuedRequest = (Vec<u8>, oneshot::Sender<Result<Vec<u8>, InvocationError>>);

/// A cheap, cloneable handle that lets other tasks submit requests to a
/// [`Sender`] that is being driven elsewhere (typically in a loop calling
/// [`Sender::step`]), without needing mutable access to it.
#[derive(Clone)]
pub struct Enqueuer(mpsc::UnboundedSender<QueuedRequest>);

impl Enqueuer {
    /// Serializes and enqueues `request`, returning its response once the
    /// driving `Sender` has sent it and received a reply.
    pub async fn invoke<R: RemoteCall>(&self, request: &R) -> Result<R::Return, InvocationError> {
        let body = self.invoke_raw(request.to_bytes()).await?;
        R::Return::from_bytes(&body).map_err(InvocationError::from)
    }

    /// Enqueues a raw, already-serialized request body.
    pub async fn invoke_raw(&self, body: Vec<u8>) -> Result<Vec<u8>, InvocationError> {
        let (tx, rx) = oneshot::channel();
        self.0
            .send((body, tx))
            .map_err(|_| InvocationError::Dropped)?;
        rx.await.map_err(|_| InvocationError::Dropped)?
    }
}

/// Drives a single MTProto connection: reads and writes framed messages
/// over a [`Transport`], and multiplexes requests and updates through a
/// [`Mtp`] implementation.
pub struct Sender<T: Transport, M: Mtp> {
    stream: NetStream,
    transport: T,
    mtp: M,
    addr: ServerAddr,
    requests: Vec<Request>,
    enqueue_tx: mpsc::UnboundedSender<QueuedRequest>,
    enqueue_rx: mpsc::UnboundedReceiver<QueuedRequest>,
    next_ping: Instant,
    read_buffer: Vec<u8>,
    read_tail: usize,
    write_buffer: RingBuffer<u8>,
    quick_ack_tolerance: usize,
    quick_ack_misses: usize,
}

impl<T: Transport, M: Mtp> Sender<T, M> {
    async fn new(transport: T, mtp: M, addr: ServerAddr, stream: NetStream) -> Self {
        let (enqueue_tx, enqueue_rx) = mpsc::unbounded_channel();
        Self {
            stream,
            transport,
            mtp,
            addr,
            requests: Vec::new(),
            enqueue_tx,
            enqueue_rx,
            next_ping: Instant::now() + PING_DELAY,
            read_buffer: vec![0; MAXIMUM_DATA],
            read_tail: 0,
            write_buffer: RingBuffer::with_capacity(MAXIMUM_DATA, LEADING_BUFFER_SPACE),
            quick_ack_tolerance: DEFAULT_QUICK_ACK_TOLERANCE,
            quick_ack_misses: 0,
        }
    }

    /// Connects to `addr`, retrying according to `policy` when the
    /// underlying TCP connection fails to establish.
    pub async fn connect(
        transport: T,
        mtp: M,
        addr: ServerAddr,
        policy: &dyn ReconnectionPolicy,
    ) -> Result<Self, io::Error> {
        let mut attempts: usize = 0;
        loop {
            match NetStream::connect(&addr).await {
                Ok(stream) => return Ok(Self::new(transport, mtp, addr, stream).await),
                Err(err) => {
                    attempts += 1;
                    match policy.should_retry(attempts) {
                        std::ops::ControlFlow::Continue(delay) => {
                            warn!("connection attempt {attempts} failed: {err}, retrying in {delay:?}");
                            crate::utils::sleep(delay).await;
                        }
                        std::ops::ControlFlow::Break(()) => return Err(err),
                    }
                }
            }
        }
    }

    /// Returns a cloneable handle that can enqueue requests on this sender
    /// from another task.
    pub fn enqueuer(&self) -> Enqueuer {
        Enqueuer(self.enqueue_tx.clone())
    }

    /// Overrides how many consecutive quick-ack frames are silently
    /// discarded before the connection is treated as stuck, in place of the
    /// conservative default of `DEFAULT_QUICK_ACK_TOLERANCE`.
    pub fn set_quick_ack_tolerance(&mut self, tolerance: usize) {
        self.quick_ack_tolerance = tolerance;
    }

    /// Serializes `request` and waits for its response.
    pub async fn invoke<R: RemoteCall>(&mut self, request: &R) -> Result<R::Return, InvocationError> {
        let body = self.invoke_raw(request.to_bytes()).await?;
        R::Return::from_bytes(&body).map_err(InvocationError::from)
    }

    /// Enqueues a raw request body and drives `step` until its response
    /// arrives.
    pub async fn invoke_raw(&mut self, body: Vec<u8>) -> Result<Vec<u8>, InvocationError> {
        let (tx, rx) = oneshot::channel();
        self.enqueue_body(body, tx);
        self.step_until_receive(rx).await
    }

    pub(crate) fn enqueue_body(
        &mut self,
        body: Vec<u8>,
        result: oneshot::Sender<Result<Vec<u8>, InvocationError>>,
    ) {
        self.requests.push(Request {
            body,
            state: RequestState::NotSerialized,
            result,
            bad_msg_retries: 0,
            flood_retries: 0,
        });
    }

    fn drain_enqueued(&mut self) {
        while let Ok((body, result)) = self.enqueue_rx.try_recv() {
            self.enqueue_body(body, result);
        }
    }

    async fn step_until_receive(
        &mut self,
        mut rx: oneshot::Receiver<Result<Vec<u8>, InvocationError>>,
    ) -> Result<Vec<u8>, InvocationError> {
        loop {
            if let Ok(result) = rx.try_recv() {
                return result;
            }
            match self.step().await {
                Ok(updates) => {
                    // No channel of our own to forward to here; the caller
                    // driving `invoke` directly is not interested in
                    // updates produced as a side effect. They're dropped,
                    // matching a direct `invoke` on a sender that isn't
                    // otherwise being polled for updates.
                    debug!("dropping {} update(s) observed during invoke", updates.len());
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// The earliest instant `step` should wake up for, even with no I/O
    /// activity: either the next keepalive ping, or the earliest pending
    /// back-off deadline.
    fn next_wakeup(&self) -> Instant {
        self.requests
            .iter()
            .filter_map(|r| match r.state {
                RequestState::Waiting { until } => Some(until),
                _ => None,
            })
            .fold(self.next_ping, |a, b| a.min(b))
    }

    /// Drives the connection forward by one step: reading and processing
    /// any available data, writing out any pending requests, or reacting
    /// to a keepalive/back-off deadline. Returns any updates observed.
    pub async fn step(&mut self) -> Result<Vec<UpdatesLike>, ReadError> {
        self.drain_enqueued();
        self.try_fill_write();

        let (mut reader, mut writer) = self.stream.split();

        let sleep = pin!(crate::utils::sleep_until(self.next_wakeup()));
        let read = pin!(reader.read(&mut self.read_buffer[self.read_tail..]));

        if self.write_buffer.is_empty() {
            match select(read, sleep).await {
                Either::Left((result, _)) => self.on_net_read(result?),
                Either::Right(((), _)) => return self.on_wakeup().await,
            }
        } else {
            let write = pin!(writer.write(&self.write_buffer[..]));
            match select(read, select(write, sleep)).await {
                Either::Left((result, _)) => self.on_net_read(result?),
                Either::Right((Either::Left((result, _)), _)) => self.on_net_write(result?),
                Either::Right((Either::Right(((), _)), _)) => return self.on_wakeup().await,
            }
        }
    }

    fn on_net_read(&mut self, n: usize) -> Result<Vec<UpdatesLike>, ReadError> {
        if n == 0 {
            return Err(ReadError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )));
        }
        self.read_tail += n;

        let mut updates = Vec::new();
        loop {
            match self.transport.unpack(&mut self.read_buffer[..self.read_tail]) {
                Ok(offset) => {
                    self.quick_ack_misses = 0;
                    let deserialization = self
                        .mtp
                        .deserialize(&self.read_buffer[offset.data_start..offset.data_end])?;
                    for (msg_id, result) in deserialization.rpc_results {
                        self.process_rpc_result(msg_id, result);
                    }
                    for update in deserialization.updates {
                        if let Some(u) = self.process_update(&update) {
                            updates.push(u);
                        }
                    }
                    self.read_buffer.copy_within(offset.next_offset..self.read_tail, 0);
                    self.read_tail -= offset.next_offset;
                }
                Err(tgwire_mtproto::transport::Error::MissingBytes) => break,
                Err(tgwire_mtproto::transport::Error::QuickAck { len }) => {
                    self.quick_ack_misses += 1;
                    if self.quick_ack_misses > self.quick_ack_tolerance {
                        return Err(ReadError::Io(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "too many consecutive quick-ack frames",
                        )));
                    }
                    self.read_buffer.copy_within(len..self.read_tail, 0);
                    self.read_tail -= len;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(updates)
    }

    fn on_net_write(&mut self, n: usize) -> Result<Vec<UpdatesLike>, ReadError> {
        self.write_buffer.skip(n);
        if self.write_buffer.is_empty() {
            self.write_buffer.clear();
            for request in self.requests.iter_mut() {
                if let RequestState::Serialized(msg_id) = request.state {
                    request.state = RequestState::Sent(msg_id);
                }
            }
        }
        Ok(Vec::new())
    }

    async fn on_wakeup(&mut self) -> Result<Vec<UpdatesLike>, ReadError> {
        let now = Instant::now();

        for request in self.requests.iter_mut() {
            if let RequestState::Waiting { until } = request.state {
                if until <= now {
                    request.state = RequestState::NotSerialized;
                }
            }
        }

        if now >= self.next_ping {
            self.on_ping_timeout();
        }

        Ok(Vec::new())
    }

    fn on_ping_timeout(&mut self) {
        let ping_id = generate_random_id();
        debug!("enqueueing keepalive ping {ping_id}");
        // Fire-and-forget: nobody is waiting on the ping's `Pong` result.
        let (tx, _rx) = oneshot::channel();
        self.enqueue_body(
            tl::functions::PingDelayDisconnect {
                ping_id,
                disconnect_delay: NO_PING_DISCONNECT,
            }
            .to_bytes(),
            tx,
        );
        self.next_ping = Instant::now() + PING_DELAY;
    }

    fn try_fill_write(&mut self) {
        if !self.write_buffer.is_empty() {
            return;
        }

        for request in self.requests.iter_mut() {
            if matches!(request.state, RequestState::NotSerialized) {
                match self.mtp.push(&request.body) {
                    Some(msg_id) => request.state = RequestState::Serialized(msg_id),
                    None => break,
                }
            }
        }

        let body = self.mtp.finalize();
        if body.is_empty() {
            return;
        }
        self.write_buffer.extend(&body);
        self.transport.pack(&mut self.write_buffer);
    }

    fn find_request_mut(&mut self, msg_id: MsgId) -> Option<&mut Request> {
        self.requests.iter_mut().find(|r| match r.state {
            RequestState::Sent(id) | RequestState::Serialized(id) => id == msg_id,
            _ => false,
        })
    }

    fn pop_request(&mut self, msg_id: MsgId) -> Option<Request> {
        let index = self.requests.iter().position(|r| match r.state {
            RequestState::Sent(id) | RequestState::Serialized(id) => id == msg_id,
            _ => false,
        })?;
        Some(self.requests.remove(index))
    }

    fn finish_request(&mut self, msg_id: MsgId, result: Result<Vec<u8>, InvocationError>) {
        if let Some(request) = self.pop_request(msg_id) {
            let _ = request.result.send(result);
        }
    }

    fn process_rpc_result(&mut self, msg_id: MsgId, result: Result<Vec<u8>, RequestError>) {
        match result {
            Ok(body) => self.finish_request(msg_id, Ok(body)),
            Err(RequestError::RpcError(e)) => {
                let caused_by = self
                    .find_request_mut(msg_id)
                    .and_then(|r| constructor_id(&r.body));
                let rpc_error = RpcError {
                    code: e.code,
                    name: e.name,
                    value: e.value,
                    caused_by,
                };

                if let Some(seconds) = flood_wait_seconds(&rpc_error) {
                    if self.schedule_flood_wait(msg_id, seconds) {
                        return;
                    }
                }

                self.finish_request(msg_id, Err(InvocationError::Rpc(rpc_error)));
            }
            Err(RequestError::Dropped) => {
                self.finish_request(msg_id, Err(InvocationError::Dropped));
            }
            Err(RequestError::BadMessage { code }) => {
                self.process_bad_message(msg_id, code);
            }
            Err(RequestError::Deserialize(e)) => {
                self.finish_request(msg_id, Err(InvocationError::from(e)));
            }
        }
    }

    /// Schedules `msg_id`'s request to be resent after `seconds`, unless it
    /// is outside policy (too long a wait, or too many retries already),
    /// in which case it's left alone so the caller sees the `rpc_error`.
    fn schedule_flood_wait(&mut self, msg_id: MsgId, seconds: u32) -> bool {
        if seconds > MAX_FLOOD_WAIT_SECS {
            return false;
        }
        let Some(request) = self.find_request_mut(msg_id) else {
            return false;
        };
        if request.flood_retries >= MAX_FLOOD_RETRIES {
            return false;
        }
        request.flood_retries += 1;
        request.state = RequestState::Waiting {
            until: Instant::now() + Duration::from_secs(seconds as u64),
        };
        true
    }

    fn process_bad_message(&mut self, msg_id: MsgId, code: i32) {
        if BAD_MSG_RETRYABLE.contains(&code) {
            if let Some(request) = self.find_request_mut(msg_id) {
                if request.bad_msg_retries < MAX_BAD_MSG_RETRIES {
                    request.bad_msg_retries += 1;
                    request.state = RequestState::NotSerialized;
                    return;
                }
            }
            warn!(
                "bad_msg_notification {code} ({}) exceeded retry budget, dropping request",
                bad_message_description(code)
            );
            self.finish_request(msg_id, Err(InvocationError::Dropped));
        } else if BAD_MSG_IGNORED.contains(&code) {
            warn!(
                "bad_msg_notification {code} ({}), not retrying this call",
                bad_message_description(code)
            );
        } else {
            warn!(
                "bad_msg_notification {code} ({}), dropping request",
                bad_message_description(code)
            );
            self.finish_request(msg_id, Err(InvocationError::Dropped));
        }
    }

    fn process_update(&mut self, body: &[u8]) -> Option<UpdatesLike> {
        if let Ok(updates) = tl::enums::Updates::from_bytes(body) {
            return Some(UpdatesLike::Updates(updates));
        }
        if let Ok(affected) = tl::types::messages::AffectedMessages::from_bytes(body) {
            return Some(UpdatesLike::AffectedMessages(affected));
        }
        if let Ok(invited) = tl::types::messages::InvitedUsers::from_bytes(body) {
            return Some(UpdatesLike::InvitedUsers(invited));
        }
        warn!(
            "received an update-like body that could not be deserialized as any known update type (constructor: {:?})",
            constructor_id(body)
        );
        None
    }
}

impl<T: Transport> Sender<T, mtp::Encrypted> {
    /// The authorization key currently in use for this connection.
    pub fn auth_key(&self) -> [u8; 256] {
        self.mtp.auth_key()
    }
}

/// Connects to `addr` and generates a new authorization key for the
/// resulting connection.
pub async fn connect<T: Transport>(
    transport: T,
    addr: ServerAddr,
    policy: &dyn ReconnectionPolicy,
) -> Result<Sender<T, mtp::Encrypted>, AuthorizationError> {
    let sender = Sender::connect(transport, mtp::Plain::new(), addr, policy).await?;
    generate_auth_key(sender).await
}

/// Connects to `addr` reusing a previously generated authorization key.
pub async fn connect_with_auth<T: Transport>(
    transport: T,
    addr: ServerAddr,
    auth_key: [u8; 256],
    policy: &dyn ReconnectionPolicy,
) -> Result<Sender<T, mtp::Encrypted>, io::Error> {
    Sender::connect(
        transport,
        mtp::Encrypted::build().finish(auth_key),
        addr,
        policy,
    )
    .await
}

/// Drives the Diffie-Hellman key exchange over `sender`'s plaintext
/// connection, returning a new [`Sender`] configured to encrypt subsequent
/// traffic with the resulting authorization key.
pub async fn generate_auth_key<T: Transport>(
    mut sender: Sender<T, mtp::Plain>,
) -> Result<Sender<T, mtp::Encrypted>, AuthorizationError> {
    info!("generating new authorization key...");

    let (request, data) = authentication::step1()?;
    let response = sender.invoke_raw(request).await?;
    let (request, data) = authentication::step2(data, &response)?;
    let response = sender.invoke_raw(request).await?;
    let (request, data) = authentication::step3(data, &response)?;
    let mut response = sender.invoke_raw(request.clone()).await?;

    // The server may ask us to resubmit `set_client_dh_params` as-is
    // (`dh_gen_retry`) if it didn't register our first attempt; retry a
    // bounded number of times rather than treating it as a hard failure.
    let mut retries = 0;
    let finished = loop {
        match authentication::create_key(data.clone(), &response) {
            Ok(finished) => break finished,
            Err(authentication::Error::DHGenRetry) if retries < MAX_DH_GEN_RETRIES => {
                retries += 1;
                warn!("dh_gen_retry received, resubmitting set_client_dh_params");
                response = sender.invoke_raw(request.clone()).await?;
            }
            Err(e) => return Err(e.into()),
        }
    };
    let authentication::Finished {
        auth_key,
        time_offset,
        first_salt,
    } = finished;

    info!("authorization key generated successfully");

    let Sender {
        stream,
        transport,
        requests,
        enqueue_tx,
        enqueue_rx,
        read_buffer,
        read_tail,
        write_buffer,
        addr,
        quick_ack_tolerance,
        ..
    } = sender;

    Ok(Sender {
        stream,
        transport,
        mtp: mtp::Encrypted::build()
            .time_offset(time_offset)
            .first_salt(first_salt)
            .finish(auth_key),
        addr,
        requests,
        enqueue_tx,
        enqueue_rx,
        next_ping: Instant::now() + PING_DELAY,
        read_buffer,
        read_tail,
        write_buffer,
        quick_ack_tolerance,
        quick_ack_misses: 0,
    })
}
