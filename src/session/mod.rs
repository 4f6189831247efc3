//! # Connection Session
//!
//! One [`Session`] exists per concentrator connection. It decodes inbound
//! frames, acknowledges registrations and heartbeats, publishes meter
//! readings and pairs passthrough commands with their responses.
//!
//! Commands and responses are paired by sequence number. A synchronous
//! command reserves a one-shot slot under a sequence number that no other
//! pending command uses; the matching uplink takes the slot out of the map
//! and completes it. A slot is removed exactly once, either by its response
//! or by the timeout.

pub mod scheduler;

pub use scheduler::{spawn_scheduler, POLLED_IDENTIFIERS};

use crate::config::GatewayConfig;
use crate::constants::COMMAND_DEFAULT_RESERVED;
use crate::dlt645::MeterAddress;
use crate::error::{GatewayError, Result};
use crate::telemetry::{TelemetryMessage, TelemetrySink};
use crate::transport::{Frame, Message, MessageCode, Montage, PassthroughMessage, Sequence};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::sync::{Arc, PoisonError};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Running polling task and the token that stops it.
struct SchedulerHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Per-connection protocol state.
pub struct Session {
    peer: String,
    config: Arc<GatewayConfig>,
    sink: Arc<dyn TelemetrySink>,
    outbound: mpsc::Sender<Frame>,
    pending: DashMap<Sequence, oneshot::Sender<PassthroughMessage>>,
    token: CancellationToken,
    scheduler: Mutex<Option<SchedulerHandle>>,
    address: std::sync::Mutex<Option<MeterAddress>>,
}

impl Session {
    /// Creates a session whose outbound frames go to `outbound`.
    pub fn new(
        peer: impl Into<String>,
        config: Arc<GatewayConfig>,
        sink: Arc<dyn TelemetrySink>,
        outbound: mpsc::Sender<Frame>,
    ) -> Arc<Self> {
        Arc::new(Session {
            peer: peer.into(),
            config,
            sink,
            outbound,
            pending: DashMap::new(),
            token: CancellationToken::new(),
            scheduler: Mutex::new(None),
            address: std::sync::Mutex::new(None),
        })
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Meter address announced by the last registration.
    pub fn address(&self) -> Option<MeterAddress> {
        *self.address.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of commands waiting for a response.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Handles one inbound frame.
    pub async fn dispatch(self: &Arc<Self>, frame: Frame) {
        debug!("{}: received {}", self.peer, frame);

        if !frame.payload.is_empty() {
            let montage = Montage::decompose(&frame.payload);
            match Message::decode(frame.code, &montage) {
                Ok(Some(message)) => self.handle_message(frame.sequence, message).await,
                Ok(None) => debug!("{}: no message body for {}", self.peer, frame.code),
                Err(e) => warn!("{}: failed to decode {}: {}", self.peer, frame.code, e),
            }
        }

        if let Some(answer) = frame.answer() {
            if let Err(e) = self.send(answer).await {
                warn!("{}: failed to answer {}: {}", self.peer, frame.code, e);
            }
        }
    }

    async fn handle_message(self: &Arc<Self>, sequence: Sequence, message: Message) {
        match message {
            Message::Register(register) => {
                info!(
                    "{}: register address={} version={} imei={} iccid={} signal={}",
                    self.peer,
                    register.address,
                    register.version,
                    register.imei,
                    register.iccid,
                    register.signal
                );
                self.start_polling(register.address).await;
            }
            Message::Heartbeat(heartbeat) => {
                debug!("{}: heartbeat signal={}", self.peer, heartbeat.signal);
            }
            Message::Signal(signal) => {
                info!("{}: signal intensity={}", self.peer, signal.intensity);
            }
            Message::Passthrough(passthrough) => {
                if let Some(failure) = &passthrough.failure {
                    warn!(
                        "{}: passthrough entry {} of {} rejected: {}",
                        self.peer, failure.index, passthrough.count, failure.error
                    );
                }
                let payloads = self.telemetry_payloads(&passthrough);
                match self.pending.remove(&sequence) {
                    Some((_, slot)) => {
                        if slot.send(passthrough).is_err() {
                            debug!("{}: waiter for {} already gone", self.peer, sequence);
                        }
                    }
                    None => debug!("{}: no pending command for {}", self.peer, sequence),
                }
                self.publish(payloads).await;
            }
        }
    }

    /// Serializes one telemetry event per forwarded reading.
    fn telemetry_payloads(&self, message: &PassthroughMessage) -> Vec<Vec<u8>> {
        let mut payloads = Vec::new();
        for frame in &message.parsed {
            let reading = match frame.data.reading() {
                Ok(reading) => reading,
                Err(e) => {
                    warn!("{}: meter {}: {}", self.peer, frame.address, e);
                    continue;
                }
            };
            info!("DLT645-2007: {} -> {}", frame.address, reading);

            let Some(telemetry) = TelemetryMessage::from_reading(&frame.address, &reading) else {
                continue;
            };
            match telemetry.to_json() {
                Ok(payload) => payloads.push(payload),
                Err(e) => error!("{}: failed to serialize telemetry: {}", self.peer, e),
            }
        }
        payloads
    }

    /// Hands serialized events to the sink, after the wait slot is resolved.
    async fn publish(&self, payloads: Vec<Vec<u8>>) {
        for payload in payloads {
            if let Err(e) = self
                .sink
                .publish(&self.config.telemetry.topic, &payload)
                .await
            {
                error!("{}: failed to publish telemetry: {}", self.peer, e);
            }
        }
    }

    /// (Re)starts polling for `address`, stopping any previous scheduler.
    async fn start_polling(self: &Arc<Self>, address: MeterAddress) {
        if self.is_closed() {
            return;
        }
        *self.address.lock().unwrap_or_else(PoisonError::into_inner) = Some(address);

        let mut scheduler = self.scheduler.lock().await;
        if let Some(previous) = scheduler.take() {
            debug!("{}: replacing scheduler", self.peer);
            previous.token.cancel();
        }
        let token = self.token.child_token();
        let handle = spawn_scheduler(Arc::clone(self), address, token.clone());
        *scheduler = Some(SchedulerHandle { token, handle });
    }

    /// Queues a frame for the connection writer.
    pub async fn send(&self, frame: Frame) -> Result<()> {
        self.outbound
            .send(frame)
            .await
            .map_err(|_| GatewayError::ConnectionClosed)
    }

    /// Sends meter frames without waiting for the response.
    pub async fn command_passthrough_async(&self, items: &[Vec<u8>]) -> Result<Sequence> {
        let frame = Frame::command(MessageCode::PASSTHROUGH, passthrough_payload(items)?);
        let sequence = frame.sequence;
        self.send(frame).await?;
        Ok(sequence)
    }

    /// Sends meter frames and waits for the response.
    ///
    /// Returns `Ok(None)` when no response arrives within the command timeout.
    pub async fn command_passthrough_sync(
        &self,
        items: &[Vec<u8>],
    ) -> Result<Option<PassthroughMessage>> {
        let payload = passthrough_payload(items)?;
        let (tx, mut rx) = oneshot::channel();
        let sequence = self.reserve_slot(tx);

        let frame = Frame::new(
            COMMAND_DEFAULT_RESERVED,
            sequence,
            MessageCode::PASSTHROUGH,
            payload.into(),
        );
        if let Err(e) = self.send(frame).await {
            self.pending.remove(&sequence);
            return Err(e);
        }

        let wait = self.config.polling.command_timeout();
        match timeout(wait, &mut rx).await {
            Ok(Ok(message)) => Ok(Some(message)),
            Ok(Err(_)) => {
                debug!("{}: command {} abandoned", self.peer, sequence);
                Ok(None)
            }
            Err(_) => {
                self.pending.remove(&sequence);
                match rx.try_recv() {
                    Ok(message) => Ok(Some(message)),
                    Err(_) => {
                        error!(
                            "{}: command {} timed out after {:?}",
                            self.peer, sequence, wait
                        );
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Asks the concentrator for its signal strength.
    pub async fn query_signal(&self) -> Result<Sequence> {
        let frame = Frame::command(MessageCode::SIGNAL, Vec::new());
        let sequence = frame.sequence;
        self.send(frame).await?;
        Ok(sequence)
    }

    /// Stops the scheduler and abandons pending commands.
    pub fn close(&self) {
        self.token.cancel();
        self.pending.clear();
    }

    /// Closes the session and waits for the scheduler to exit.
    pub async fn shutdown(&self) {
        self.close();
        let running = self.scheduler.lock().await.take();
        if let Some(running) = running {
            if let Err(e) = running.handle.await {
                warn!("{}: scheduler ended abnormally: {}", self.peer, e);
            }
        }
    }

    fn reserve_slot(&self, tx: oneshot::Sender<PassthroughMessage>) -> Sequence {
        loop {
            let sequence = Sequence::random();
            if let Entry::Vacant(slot) = self.pending.entry(sequence) {
                slot.insert(tx);
                return sequence;
            }
        }
    }
}

/// Passthrough downlink body: the entry count followed by the meter frames.
pub fn passthrough_payload(items: &[Vec<u8>]) -> Result<Vec<u8>> {
    if items.is_empty() {
        return Err(GatewayError::InvalidDataLength);
    }
    let count = u8::try_from(items.len()).map_err(|_| GatewayError::InvalidDataLength)?;
    let mut montage = Montage::new();
    montage.push_field(vec![count]).push_fields(items.iter().cloned());
    montage.compose()
}
