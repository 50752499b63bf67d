//! A single Discord Gateway WebSocket session.
//!
//! A `Shard` owns the connect/Hello/Identify-or-Resume/heartbeat/reconnect
//! state machine for one session. Dispatch frames are decoded, deduplicated
//! against the event blacklist, run through the [`crate::dispatch`] table,
//! and published through whatever [`sandwich_producer::Producer`] the owning
//! `ShardGroup`/`Manager` configured — all inline on the shard's own read
//! loop, so a single shard's events are always processed in the order
//! Discord sent them.

use crate::chunking::{ChunkRegistry, GuildChunks};
use crate::compression::ZlibDecompressor;
use crate::dispatch::{DispatchContext, DispatchTable, HandlerOutcome};
use crate::error::{CloseCode, GatewayError};
use crate::heartbeat::HeartbeatHandler;
use crate::opcode::OpCode;
use crate::payload::{
    GatewayPayload, HelloPayload, IdentifyPayload, RawGatewayPayload, RequestGuildMembersPayload,
    ResumePayload, SandwichPayload, ShardMetadata,
};
use crate::{DEFAULT_GATEWAY_URL, GATEWAY_VERSION};

use ahash::RandomState;
use dashmap::DashSet;
use flume::Sender;
use futures_util::{stream::SplitSink, stream::SplitStream, SinkExt, StreamExt};
use parking_lot::RwLock;
use sandwich_model::{GuildMember, Intents, Snowflake};
use sandwich_producer::{Producer, PublishMessage};
use serde_json::value::RawValue;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;

/// Resources a shard needs but does not own: these are shared across every
/// shard a `ShardGroup`/`Manager` runs, so they live behind `Arc` and are
/// handed in at construction rather than rebuilt per shard.
pub struct ShardContext {
    pub state: Arc<sandwich_state::SandwichState>,
    pub dispatch: Arc<DispatchTable>,
    pub identify_bucket: Arc<crate::identify_bucket::IdentifyBucket>,
    pub producer: Arc<dyn Producer>,
    pub channel_name: String,
    pub manager_name: String,
    pub event_blacklist: Arc<RwLock<HashSet<String>>>,
    pub produce_blacklist: Arc<RwLock<HashSet<String>>>,
    /// Shared with the owning `ShardGroup`: `false` until every shard in the
    /// group has signalled Ready, at which point events are published
    /// downstream instead of only updating state.
    pub floodgate: Arc<AtomicBool>,
}

/// Sent to the shard's outbound queue; handled by the write side of the
/// connection loop so sends never race with the heartbeat/close path.
enum ShardCommand {
    Send(String),
}

enum GatewayAction {
    Dispatch { name: String, data: Box<RawValue> },
    Heartbeat,
    Reconnect,
    InvalidSession(bool),
    None,
}

/// Mirrors the distilled `ShardStatus` state machine: `Idle -> Waiting ->
/// Connecting -> Connected -> Ready -> (Reconnecting -> Connecting)* ->
/// Closing -> Closed` (plus `Erroring` on an unrecoverable failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardState {
    Idle,
    Waiting,
    Connecting,
    Connected,
    Ready,
    Reconnecting,
    Closing,
    Closed,
    Erroring,
}

#[derive(Debug, Clone)]
pub struct ShardConfig {
    pub token: String,
    pub intents: Intents,
    pub gateway_url: String,
    pub large_threshold: u8,
    pub compress: bool,
    pub chunk_guilds_on_startup: bool,
    /// How long the lazy-load loop waits after the last `GUILD_CREATE`
    /// before deciding `READY`'s guild backlog has finished arriving.
    pub ready_timeout: Duration,
    pub max_reconnect_attempts: u32,
    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
}

impl ShardConfig {
    pub fn new(token: impl Into<String>, intents: Intents) -> Self {
        Self {
            token: token.into(),
            intents,
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            large_threshold: 250,
            compress: false,
            chunk_guilds_on_startup: false,
            ready_timeout: Duration::from_secs(5),
            max_reconnect_attempts: 10,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 60_000,
        }
    }

    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }
}

#[derive(Debug, Clone)]
struct SessionData {
    session_id: String,
    resume_gateway_url: String,
}

/// One WebSocket session to Discord's Gateway.
pub struct Shard {
    shard_id: u32,
    shard_count: u32,
    config: ShardConfig,
    ctx: ShardContext,

    state: RwLock<ShardState>,
    session: RwLock<Option<SessionData>>,
    sequence: AtomicU64,
    heartbeat: RwLock<Option<HeartbeatHandler>>,
    decompressor: RwLock<ZlibDecompressor>,
    shutdown: AtomicBool,

    command_tx: Sender<ShardCommand>,
    command_rx: flume::Receiver<ShardCommand>,

    ready_notify: Notify,
    ready_fired: AtomicBool,

    /// Guilds this shard currently owns, seeded from `READY`'s unavailable
    /// list and grown/shrunk by `GUILD_CREATE`/`GUILD_DELETE`.
    guilds: Arc<DashSet<Snowflake, RandomState>>,
    /// Guild IDs still awaited by the `READY` lazy-load loop.
    lazy: Arc<DashSet<Snowflake, RandomState>>,
    /// Guild IDs reported unavailable by a `GUILD_DELETE{unavailable:true}`.
    unavailable: Arc<DashSet<Snowflake, RandomState>>,
    chunking: Arc<ChunkRegistry>,
}

impl Shard {
    pub fn new(shard_id: u32, shard_count: u32, config: ShardConfig, ctx: ShardContext) -> Self {
        let (command_tx, command_rx) = flume::unbounded();

        Self {
            shard_id,
            shard_count,
            config,
            ctx,
            state: RwLock::new(ShardState::Idle),
            session: RwLock::new(None),
            sequence: AtomicU64::new(0),
            heartbeat: RwLock::new(None),
            decompressor: RwLock::new(ZlibDecompressor::new()),
            shutdown: AtomicBool::new(false),
            command_tx,
            command_rx,
            ready_notify: Notify::new(),
            ready_fired: AtomicBool::new(false),
            guilds: Arc::new(DashSet::with_hasher(RandomState::new())),
            lazy: Arc::new(DashSet::with_hasher(RandomState::new())),
            unavailable: Arc::new(DashSet::with_hasher(RandomState::new())),
            chunking: Arc::new(ChunkRegistry::new()),
        }
    }

    pub fn shard_id(&self) -> u32 {
        self.shard_id
    }

    pub fn state(&self) -> ShardState {
        *self.state.read()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn latency(&self) -> Option<Duration> {
        self.heartbeat.read().as_ref().and_then(|h| h.latency())
    }

    pub fn owned_guild_count(&self) -> usize {
        self.guilds.len()
    }

    pub fn owns_guild(&self, guild_id: Snowflake) -> bool {
        self.guilds.contains(&guild_id)
    }

    /// Lets a `ShardGroup`'s readiness watcher be exercised without an
    /// actual gateway connection.
    #[cfg(test)]
    pub(crate) fn mark_ready_for_test(&self) {
        self.mark_ready();
    }

    /// Request a graceful close: the read loop exits the next time it gets
    /// control, instead of a hard socket abort.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        *self.state.write() = ShardState::Closing;
    }

    /// Resolves once this shard's session has reached `READY`/`RESUMED` for
    /// the first time. Coalesced: a second resolution attempt (a stray
    /// `RESUMED` arriving right after `READY`, say) is a no-op.
    pub async fn wait_for_ready(&self) {
        self.ready_notify.notified().await;
    }

    fn mark_ready(&self) {
        if !self.ready_fired.swap(true, Ordering::SeqCst) {
            self.ready_notify.notify_one();
        }
    }

    /// Send a raw payload (e.g. a voice-state or presence update) out on
    /// this shard's connection. Queued through the command channel so it
    /// never races the read loop's own sends.
    pub fn send_payload<T: serde::Serialize>(
        &self,
        op: OpCode,
        data: T,
    ) -> Result<(), GatewayError> {
        let payload = GatewayPayload::new(op, data);
        let json = serde_json::to_string(&payload)?;
        self.command_tx
            .send(ShardCommand::Send(json))
            .map_err(|_| GatewayError::Closed {
                code: 0,
                reason: "shard command channel closed".to_string(),
            })
    }

    /// Sends `RequestGuildMembers` for every guild this shard currently
    /// owns and registers a [`GuildChunks`] entry per guild. `channel`, when
    /// supplied, puts every guild in push mode (its members are forwarded as
    /// each chunk arrives); `None` tracks completion only.
    pub fn chunk_all_guilds(
        &self,
        channel: Option<flume::Sender<Vec<GuildMember<'static>>>>,
    ) -> Result<(), GatewayError> {
        for guild_id in self.guilds.iter() {
            let guild_id = *guild_id;
            let chunks = match &channel {
                Some(tx) => GuildChunks::push(tx.clone()),
                None => GuildChunks::partial(),
            };
            self.chunking.register(guild_id, chunks);

            let payload = RequestGuildMembersPayload {
                guild_id,
                query: Cow::Borrowed(""),
                limit: 0,
                presences: None,
                user_ids: None,
                nonce: format!("{}-{}", self.shard_id, guild_id),
            };
            self.send_payload(OpCode::RequestGuildMembers, payload)?;
        }
        Ok(())
    }

    /// Runs the connect/handshake/read loop forever, reconnecting with
    /// backoff until `shutdown()` is called or a fatal close code is seen.
    pub async fn run(&self) -> Result<(), GatewayError> {
        let mut reconnect_attempts = 0u32;

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                *self.state.write() = ShardState::Closed;
                return Ok(());
            }

            match self.connect_and_run().await {
                Ok(()) => {
                    *self.state.write() = ShardState::Closed;
                    return Ok(());
                }
                Err(GatewayError::HeartbeatTimeout) => {
                    warn!(shard_id = self.shard_id, "heartbeat ack timeout, reconnecting");
                    reconnect_attempts += 1;
                }
                Err(GatewayError::InvalidSession { resumable }) => {
                    if !resumable {
                        *self.session.write() = None;
                        self.sequence.store(0, Ordering::SeqCst);
                    }
                    warn!(shard_id = self.shard_id, resumable, "session invalidated");
                    reconnect_attempts += 1;
                }
                Err(GatewayError::Closed { code, reason }) => {
                    if let Some(close_code) = CloseCode::from_code(code) {
                        if close_code.is_fatal() {
                            error!(shard_id = self.shard_id, code, %reason, "fatal close code");
                            *self.state.write() = ShardState::Erroring;
                            return Err(GatewayError::Fatal(close_code));
                        }
                        if close_code.forces_fresh_identify() {
                            *self.session.write() = None;
                            self.sequence.store(0, Ordering::SeqCst);
                        }
                    }
                    warn!(shard_id = self.shard_id, code, %reason, "connection closed, reconnecting");
                    reconnect_attempts += 1;
                }
                Err(e) => {
                    error!(shard_id = self.shard_id, error = %e, "shard error");
                    reconnect_attempts += 1;
                }
            }

            if reconnect_attempts > self.config.max_reconnect_attempts {
                error!(shard_id = self.shard_id, reconnect_attempts, "giving up after too many reconnects");
                *self.state.write() = ShardState::Erroring;
                return Err(GatewayError::Closed {
                    code: 0,
                    reason: "max reconnect attempts exceeded".to_string(),
                });
            }

            let backoff = crate::backoff::exponential_backoff(
                reconnect_attempts - 1,
                self.config.reconnect_base_delay_ms,
                self.config.reconnect_max_delay_ms,
            );
            let backoff = crate::backoff::with_jitter(backoff, 0.25);

            *self.state.write() = ShardState::Reconnecting;
            info!(shard_id = self.shard_id, attempt = reconnect_attempts, backoff_ms = backoff.as_millis(), "waiting before reconnect");
            sleep(backoff).await;
        }
    }

    async fn connect_and_run(&self) -> Result<(), GatewayError> {
        self.decompressor.write().reset();
        self.ready_fired.store(false, Ordering::SeqCst);

        let gateway_url = self.build_gateway_url()?;
        info!(shard_id = self.shard_id, url = %gateway_url, "dialing gateway");
        *self.state.write() = ShardState::Connecting;

        let (ws_stream, _response) = connect_async(gateway_url.as_str()).await?;
        let (mut sink, mut stream) = ws_stream.split();

        let hello = self.wait_for_hello(&mut stream).await?;
        let heartbeat_interval = Duration::from_millis(hello.heartbeat_interval);
        *self.heartbeat.write() = Some(HeartbeatHandler::new(heartbeat_interval));

        self.ctx.identify_bucket.acquire(self.shard_id).await;

        let resuming = self.session.read().clone();
        if let Some(session) = resuming {
            info!(shard_id = self.shard_id, session_id = %session.session_id, "resuming session");
            self.send_resume(&mut sink, &session).await?;
        } else {
            info!(shard_id = self.shard_id, "identifying fresh session");
            self.send_identify(&mut sink).await?;
        }
        *self.state.write() = ShardState::Connected;

        self.send_heartbeat(&mut sink).await?;
        self.mark_heartbeat_sent();
        let mut next_heartbeat = Instant::now() + heartbeat_interval;

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                let _ = sink.close().await;
                return Ok(());
            }

            tokio::select! {
                message = stream.next() => {
                    match message {
                        Some(Ok(WsMessage::Text(text))) => {
                            self.handle_frame(text.as_str(), &mut stream, &mut sink).await?;
                        }
                        Some(Ok(WsMessage::Binary(data))) => {
                            if let Some(text) = self.decompress(&data)? {
                                self.handle_frame(&text, &mut stream, &mut sink).await?;
                            }
                        }
                        Some(Ok(WsMessage::Close(frame))) => {
                            let (code, reason) = close_frame_parts(frame);
                            return Err(GatewayError::Closed { code, reason });
                        }
                        Some(Ok(WsMessage::Ping(data))) => {
                            sink.send(WsMessage::Pong(data)).await?;
                        }
                        Some(Ok(WsMessage::Pong(_))) | Some(Ok(WsMessage::Frame(_))) => {}
                        Some(Err(e)) => return Err(GatewayError::WebSocket(e)),
                        None => {
                            return Err(GatewayError::Closed {
                                code: 0,
                                reason: "websocket stream ended".to_string(),
                            });
                        }
                    }
                }

                _ = sleep(next_heartbeat.saturating_duration_since(Instant::now())) => {
                    if self.heartbeat_awaiting_ack() {
                        error!(shard_id = self.shard_id, "no heartbeat ack, assuming zombie connection");
                        return Err(GatewayError::HeartbeatTimeout);
                    }
                    self.send_heartbeat(&mut sink).await?;
                    self.mark_heartbeat_sent();
                    next_heartbeat = Instant::now() + self.heartbeat_interval();
                }

                command = self.command_rx.recv_async() => {
                    match command {
                        Ok(ShardCommand::Send(json)) => {
                            trace!(shard_id = self.shard_id, "sending queued payload");
                            sink.send(WsMessage::Text(json.into())).await?;
                        }
                        Err(_) => {
                            return Err(GatewayError::Closed {
                                code: 0,
                                reason: "command channel closed".to_string(),
                            });
                        }
                    }
                }
            }
        }
    }

    /// Decodes one frame and acts on it. `READY`/`RESUMED` are special-cased
    /// here (they carry shard-lifecycle side effects a table handler can't
    /// express); everything else goes through the dispatch table and the
    /// publish gate.
    async fn handle_frame(
        &self,
        text: &str,
        stream: &mut SplitStream<WsStream>,
        sink: &mut WsSink,
    ) -> Result<(), GatewayError> {
        match self.process_frame(text)? {
            GatewayAction::Dispatch { name, data } if name == "READY" => {
                self.on_ready(&data)?;
                self.lazy_load_loop(stream, sink).await?;
                *self.state.write() = ShardState::Ready;
                self.mark_ready();
                if self.config.chunk_guilds_on_startup {
                    self.chunk_all_guilds(None)?;
                }
            }
            GatewayAction::Dispatch { name, data } if name == "RESUMED" => {
                *self.state.write() = ShardState::Ready;
                self.mark_ready();
                self.publish_gate(Some(name.as_str()), self.sequence(), &data, HandlerOutcome::routed());
            }
            GatewayAction::Dispatch { name, data } => {
                self.run_dispatch_pipeline(&name, &data);
            }
            GatewayAction::Heartbeat => {
                debug!(shard_id = self.shard_id, "server requested immediate heartbeat");
                self.send_heartbeat(sink).await?;
            }
            GatewayAction::Reconnect => {
                info!(shard_id = self.shard_id, "server requested reconnect");
                return Err(GatewayError::Closed {
                    code: 0,
                    reason: "server requested reconnect".to_string(),
                });
            }
            GatewayAction::InvalidSession(resumable) => {
                return Err(GatewayError::InvalidSession { resumable });
            }
            GatewayAction::None => {}
        }
        Ok(())
    }

    /// `READY`'s guild backlog arrives as a burst of `GUILD_CREATE` frames
    /// read directly off the same stream the normal loop uses, not a side
    /// channel. The loop exits once `ready_timeout` passes without a new
    /// `GUILD_CREATE`, on the assumption the backlog has finished draining.
    async fn lazy_load_loop(
        &self,
        stream: &mut SplitStream<WsStream>,
        sink: &mut WsSink,
    ) -> Result<(), GatewayError> {
        loop {
            let next = timeout(self.config.ready_timeout, stream.next()).await;
            let message = match next {
                Ok(message) => message,
                Err(_) => return Ok(()), // idle timeout: backlog has drained
            };

            match message {
                Some(Ok(WsMessage::Text(text))) => {
                    match self.process_frame(text.as_str())? {
                        GatewayAction::Dispatch { name, data } => {
                            let is_guild_create = name == "GUILD_CREATE";
                            self.run_dispatch_pipeline(&name, &data);
                            if !is_guild_create {
                                // Anything else arriving mid-backlog still
                                // needs handling, but only GUILD_CREATE
                                // resets the idle timer.
                                continue;
                            }
                        }
                        GatewayAction::Heartbeat => self.send_heartbeat(sink).await?,
                        GatewayAction::Reconnect => {
                            return Err(GatewayError::Closed {
                                code: 0,
                                reason: "server requested reconnect".to_string(),
                            })
                        }
                        GatewayAction::InvalidSession(resumable) => {
                            return Err(GatewayError::InvalidSession { resumable })
                        }
                        GatewayAction::None => continue,
                    }
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    if let Some(text) = self.decompress(&data)? {
                        if let GatewayAction::Dispatch { name, data } = self.process_frame(&text)? {
                            self.run_dispatch_pipeline(&name, &data);
                        }
                    }
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    let (code, reason) = close_frame_parts(frame);
                    return Err(GatewayError::Closed { code, reason });
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    sink.send(WsMessage::Pong(data)).await?;
                }
                Some(Ok(WsMessage::Pong(_))) | Some(Ok(WsMessage::Frame(_))) => {}
                Some(Err(e)) => return Err(GatewayError::WebSocket(e)),
                None => {
                    return Err(GatewayError::Closed {
                        code: 0,
                        reason: "websocket stream ended".to_string(),
                    })
                }
            }
        }
    }

    fn on_ready(&self, data: &RawValue) -> Result<(), GatewayError> {
        let ready: sandwich_model::ReadyEventData<'_> = serde_json::from_str(data.get())?;

        *self.session.write() = Some(SessionData {
            session_id: ready.session_id.as_str().to_string(),
            resume_gateway_url: ready.resume_gateway_url.as_str().to_string(),
        });

        self.ctx.state.set_bot_user_id(ready.user.id);
        self.ctx.state.set_user(ready.user.into_owned());

        for unavailable in &ready.guilds {
            self.lazy.insert(unavailable.id);
            self.guilds.insert(unavailable.id);
        }

        info!(
            shard_id = self.shard_id,
            guild_count = ready.guilds.len(),
            "received READY, entering lazy-load loop"
        );
        Ok(())
    }

    /// Panic-recovery wrapper around blacklist check, the dispatch table,
    /// and the publish gate. A single misbehaving handler must not take
    /// down the shard's read loop.
    fn run_dispatch_pipeline(&self, name: &str, data: &RawValue) {
        let seq = self.sequence();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            if self.ctx.event_blacklist.read().contains(name) {
                return Ok(HandlerOutcome::dropped());
            }
            let ctx = self.dispatch_context();
            self.ctx.dispatch.dispatch(&ctx, name, data)
        }));

        match outcome {
            Ok(Ok(outcome)) => self.publish_gate(Some(name), seq, data, outcome),
            Ok(Err(e)) => warn!(shard_id = self.shard_id, event = name, error = %e, "dispatch handler failed"),
            Err(_) => error!(shard_id = self.shard_id, event = name, "dispatch handler panicked"),
        }
    }

    fn dispatch_context(&self) -> DispatchContext {
        DispatchContext {
            state: self.ctx.state.clone(),
            shard_id: self.shard_id,
            guilds: self.guilds.clone(),
            lazy: self.lazy.clone(),
            unavailable: self.unavailable.clone(),
            chunking: self.chunking.clone(),
        }
    }

    /// 1. Drop if the group isn't floodgated yet (state still updates, just
    ///    doesn't publish). 2. Drop if the handler marked the event
    ///    non-continuable. 3. Drop if the event name is produce-blacklisted.
    /// 4. Otherwise hand the constructed payload to the producer.
    fn publish_gate(&self, name: Option<&str>, seq: u64, data: &RawValue, outcome: HandlerOutcome) {
        if !outcome.continuable {
            return;
        }
        if !self.ctx.floodgate.load(Ordering::SeqCst) {
            return;
        }
        if let Some(name) = name {
            if self.ctx.produce_blacklist.read().contains(name) {
                return;
            }
        }

        let mut trace = HashMap::new();
        trace.insert(
            "state".to_string(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
        );

        let payload = SandwichPayload {
            op: OpCode::Dispatch,
            s: Some(seq),
            t: name,
            d: data,
            extras: outcome.extras,
            trace,
            metadata: ShardMetadata {
                shard_id: self.shard_id,
                shard_count: self.shard_count,
                manager: self.ctx.manager_name.clone(),
            },
        };

        let bytes = match serde_json::to_vec(&payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(shard_id = self.shard_id, error = %e, "failed to encode published payload");
                return;
            }
        };

        if let Err(e) = self.ctx.producer.publish(
            &self.ctx.channel_name,
            PublishMessage {
                subject: self.ctx.channel_name.clone(),
                payload: bytes,
            },
        ) {
            warn!(shard_id = self.shard_id, error = %e, "producer publish failed");
        }
    }

    fn build_gateway_url(&self) -> Result<Url, GatewayError> {
        let base_url = self
            .session
            .read()
            .as_ref()
            .map(|s| s.resume_gateway_url.clone())
            .unwrap_or_else(|| self.config.gateway_url.clone());

        let mut url = Url::parse(&base_url)?;
        url.query_pairs_mut()
            .append_pair("v", &GATEWAY_VERSION.to_string())
            .append_pair("encoding", "json");
        if self.config.compress {
            url.query_pairs_mut().append_pair("compress", "zlib-stream");
        }
        Ok(url)
    }

    async fn wait_for_hello(
        &self,
        stream: &mut SplitStream<WsStream>,
    ) -> Result<HelloPayload, GatewayError> {
        let message = timeout(Duration::from_secs(10), stream.next())
            .await
            .map_err(|_| GatewayError::Closed {
                code: 0,
                reason: "timeout waiting for Hello".to_string(),
            })?
            .ok_or_else(|| GatewayError::Closed {
                code: 0,
                reason: "connection closed before Hello".to_string(),
            })??;

        let WsMessage::Text(text) = message else {
            return Err(GatewayError::Closed {
                code: 0,
                reason: "expected a text frame for Hello".to_string(),
            });
        };

        let envelope: RawGatewayPayload<'_> = serde_json::from_str(&text)?;
        if envelope.op != OpCode::Hello {
            return Err(GatewayError::Closed {
                code: 0,
                reason: "expected Hello as the first frame".to_string(),
            });
        }
        let data = envelope.d.ok_or_else(|| GatewayError::Closed {
            code: 0,
            reason: "Hello frame carried no data".to_string(),
        })?;
        Ok(serde_json::from_str(data.get())?)
    }

    async fn send_identify(&self, sink: &mut WsSink) -> Result<(), GatewayError> {
        let identify = IdentifyPayload::new(self.config.token.as_str(), self.config.intents)
            .with_shard(self.shard_id, self.shard_count);
        let envelope = GatewayPayload::new(OpCode::Identify, identify);
        let json = serde_json::to_string(&envelope)?;
        sink.send(WsMessage::Text(json.into())).await?;
        Ok(())
    }

    async fn send_resume(&self, sink: &mut WsSink, session: &SessionData) -> Result<(), GatewayError> {
        let resume = ResumePayload {
            token: Cow::Borrowed(self.config.token.as_str()),
            session_id: Cow::Borrowed(session.session_id.as_str()),
            seq: self.sequence(),
        };
        let envelope = GatewayPayload::new(OpCode::Resume, resume);
        let json = serde_json::to_string(&envelope)?;
        sink.send(WsMessage::Text(json.into())).await?;
        Ok(())
    }

    async fn send_heartbeat(&self, sink: &mut WsSink) -> Result<(), GatewayError> {
        let seq = self.sequence.load(Ordering::SeqCst);
        let seq = (seq > 0).then_some(seq);
        let json = serde_json::to_string(&crate::payload::heartbeat_payload(seq))?;
        trace!(shard_id = self.shard_id, seq, "sending heartbeat");
        sink.send(WsMessage::Text(json.into())).await?;
        Ok(())
    }

    fn mark_heartbeat_sent(&self) {
        if let Some(heartbeat) = self.heartbeat.read().as_ref() {
            heartbeat.mark_sent();
        }
    }

    fn heartbeat_awaiting_ack(&self) -> bool {
        self.heartbeat
            .read()
            .as_ref()
            .map(|h| h.is_awaiting_ack())
            .unwrap_or(false)
    }

    fn heartbeat_interval(&self) -> Duration {
        self.heartbeat
            .read()
            .as_ref()
            .map(|h| h.interval())
            .unwrap_or(Duration::from_millis(45_000))
    }

    fn decompress(&self, data: &[u8]) -> Result<Option<String>, GatewayError> {
        let mut decompressor = self.decompressor.write();
        match decompressor
            .push(data)
            .map_err(|e| GatewayError::JsonDecode(format!("decompression error: {e}")))?
        {
            Some(bytes) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| GatewayError::JsonDecode(e.to_string()))?;
                Ok(Some(text.to_string()))
            }
            None => Ok(None),
        }
    }

    /// Parses the outer envelope, updates `sequence`, and classifies the
    /// frame into an action the caller's loop acts on.
    fn process_frame(&self, text: &str) -> Result<GatewayAction, GatewayError> {
        let payload: RawGatewayPayload<'_> = serde_json::from_str(text)?;

        if let Some(seq) = payload.s {
            self.sequence.store(seq, Ordering::SeqCst);
        }

        match payload.op {
            OpCode::Dispatch => {
                if let (Some(name), Some(data)) = (payload.t, payload.d) {
                    let owned = RawValue::from_string(data.get().to_string())
                        .map_err(GatewayError::from)?;
                    return Ok(GatewayAction::Dispatch { name, data: owned });
                }
                Ok(GatewayAction::None)
            }
            OpCode::Heartbeat => Ok(GatewayAction::Heartbeat),
            OpCode::Reconnect => Ok(GatewayAction::Reconnect),
            OpCode::InvalidSession => {
                let resumable = payload.d.map(|d| d.get() == "true").unwrap_or(false);
                Ok(GatewayAction::InvalidSession(resumable))
            }
            OpCode::HeartbeatAck => {
                if let Some(heartbeat) = self.heartbeat.read().as_ref() {
                    heartbeat.mark_acked();
                }
                Ok(GatewayAction::None)
            }
            _ => {
                trace!(shard_id = self.shard_id, op = ?payload.op, "ignoring send-only opcode from server");
                Ok(GatewayAction::None)
            }
        }
    }
}

fn close_frame_parts(frame: Option<CloseFrame>) -> (u16, String) {
    frame
        .map(|f| (f.code.into(), f.reason.to_string()))
        .unwrap_or((0, String::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandwich_producer::LocalProducer;
    use sandwich_state::{CacheConfig, SandwichState};
    use std::sync::RwLock as StdRwLock;

    fn test_context() -> ShardContext {
        ShardContext {
            state: Arc::new(SandwichState::new(CacheConfig::default())),
            dispatch: Arc::new(DispatchTable::new()),
            identify_bucket: Arc::new(crate::identify_bucket::IdentifyBucket::new(1)),
            producer: Arc::new(LocalProducer::new(Default::default())),
            channel_name: "test".to_string(),
            manager_name: "test-manager".to_string(),
            event_blacklist: Arc::new(RwLock::new(HashSet::new())),
            produce_blacklist: Arc::new(RwLock::new(HashSet::new())),
            floodgate: Arc::new(AtomicBool::new(true)),
        }
    }

    fn _unused(_: StdRwLock<()>) {}

    #[test]
    fn shard_config_defaults_are_sane() {
        let config = ShardConfig::new("token", Intents::GUILDS);
        assert_eq!(config.large_threshold, 250);
        assert!(!config.compress);
    }

    #[test]
    fn shard_starts_idle_and_not_ready() {
        let shard = Shard::new(0, 1, ShardConfig::new("token", Intents::GUILDS), test_context());
        assert_eq!(shard.state(), ShardState::Idle);
        assert_eq!(shard.owned_guild_count(), 0);
    }

    #[test]
    fn build_gateway_url_has_version_and_encoding() {
        let shard = Shard::new(0, 1, ShardConfig::new("token", Intents::GUILDS), test_context());
        let url = shard.build_gateway_url().unwrap();
        assert!(url.as_str().contains("v=10"));
        assert!(url.as_str().contains("encoding=json"));
    }

    #[test]
    fn mark_ready_fires_only_once() {
        let shard = Shard::new(0, 1, ShardConfig::new("token", Intents::GUILDS), test_context());
        shard.mark_ready();
        assert!(shard.ready_fired.load(Ordering::SeqCst));
        // Second call must not panic or double-notify; coalescing is the point.
        shard.mark_ready();
    }

    #[tokio::test]
    async fn wait_for_ready_resolves_after_mark_ready() {
        let shard = Arc::new(Shard::new(0, 1, ShardConfig::new("token", Intents::GUILDS), test_context()));
        let waiter = shard.clone();
        let handle = tokio::spawn(async move { waiter.wait_for_ready().await });
        tokio::task::yield_now().await;
        shard.mark_ready();
        handle.await.unwrap();
    }
}
