//! iZZi ERV 300 controller
//!
//! Runs the bus loop on a blocking worker thread. The loop owns the transport,
//! the three value tables and the outgoing command buffer. Callers talk to it
//! through validated requests sent over a channel and read back a snapshot of
//! the latest published values.
//!
//! Pending requests are drained on every pass, connected or not.
//!
//! Loop order per frame:
//! 1. drain requests that arrived during the read
//! 2. status frame: decode sensors, recompute efficiency, count it
//! 3. command frame (slave only): mirror the foreign targets
//! 4. reconcile actuators against the buffer, reconcile virtual values
//! 5. notify every changed id once
//! 6. after two status frames: pace, then transmit (master only)
//!
//! A read timeout or a lost connection tears the transport down and retries
//! after the reconnect backoff. A panic while handling a frame is logged and
//! the loop carries on with the next one. The tables survive reconnects and
//! `disconnect`/`connect` cycles.

use super::actuators::{ActuatorCommand, ActuatorTable};
use super::constants::*;
use super::frame::{Frame, FrameKind};
use super::sensors::SensorTable;
use super::virtuals::VirtualTable;
use crate::communication::Transport;
use izzifast_core::{
    ConnectionState, ControllerError, ListenerRegistry, Role, SensorId, SensorKind,
    SensorListener, SensorListenerHandle, SensorValue, ValidationError,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Longest uninterrupted sleep, so a stop request is noticed promptly
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Loop timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerTiming {
    /// Wait for one frame before treating the link as dead
    pub read_timeout: Duration,
    /// Pause between a dropped connection and the next attempt
    pub reconnect_backoff: Duration,
    /// Gap between the second status frame and the transmit
    pub write_pacing: Duration,
}

impl Default for ControllerTiming {
    fn default() -> Self {
        Self {
            read_timeout: READ_TIMEOUT,
            reconnect_backoff: RECONNECT_BACKOFF,
            write_pacing: WRITE_PACING,
        }
    }
}

/// Message from a caller into the loop
#[derive(Debug, Clone, Copy)]
enum Request {
    Actuator(ActuatorCommand),
    ForceUpdate(SensorId),
}

#[derive(Debug, Default)]
struct Snapshot {
    state: ConnectionState,
    values: HashMap<SensorId, SensorValue>,
}

/// Everything the loop owns besides the transport
struct LoopState {
    sensors: SensorTable,
    actuators: ActuatorTable,
    virtuals: VirtualTable,
    buffer: Frame,
    requests: mpsc::UnboundedReceiver<Request>,
}

impl LoopState {
    fn new(requests: mpsc::UnboundedReceiver<Request>) -> Self {
        Self {
            sensors: SensorTable::new(),
            actuators: ActuatorTable::new(),
            virtuals: VirtualTable::new(),
            buffer: Frame::new(DEFAULT_COMMAND_FRAME),
            requests,
        }
    }
}

/// What the loop hands back when it exits
type Parked = (Box<dyn Transport>, LoopState);

/// Controller for one ventilation unit
pub struct IzziController {
    role: Role,
    timing: ControllerTiming,
    endpoint: String,
    /// Transport and tables while no loop is running
    parked: Option<Parked>,
    request_tx: mpsc::UnboundedSender<Request>,
    stop: Arc<AtomicBool>,
    snapshot: Arc<RwLock<Snapshot>>,
    listeners: ListenerRegistry,
    io_task: Option<JoinHandle<Parked>>,
}

impl IzziController {
    /// Create a controller over an unconnected transport
    pub fn new(transport: Box<dyn Transport>, role: Role) -> Self {
        Self::with_timing(transport, role, ControllerTiming::default())
    }

    pub fn with_timing(transport: Box<dyn Transport>, role: Role, timing: ControllerTiming) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        Self {
            role,
            timing,
            endpoint: transport.endpoint(),
            parked: Some((transport, LoopState::new(request_rx))),
            request_tx,
            stop: Arc::new(AtomicBool::new(false)),
            snapshot: Arc::new(RwLock::new(Snapshot::default())),
            listeners: ListenerRegistry::new(),
            io_task: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn timing(&self) -> ControllerTiming {
        self.timing
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.snapshot.read().state
    }

    /// True while the loop is synchronized with the bus
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Synchronized
    }

    /// True between `connect` and `disconnect`
    pub fn is_running(&self) -> bool {
        self.io_task.is_some()
    }

    /// Latest published value of every id seen so far
    pub fn values(&self) -> HashMap<SensorId, SensorValue> {
        self.snapshot.read().values.clone()
    }

    pub fn value(&self, id: SensorId) -> Option<SensorValue> {
        self.snapshot.read().values.get(&id).copied()
    }

    pub fn register_listener(&self, listener: Arc<dyn SensorListener>) -> SensorListenerHandle {
        self.listeners.register(listener)
    }

    pub fn unregister_listener(&self, handle: &SensorListenerHandle) -> bool {
        self.listeners.unregister(handle)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Start the background loop
    ///
    /// Fails if the loop is already running or no tokio runtime is available.
    pub async fn connect(&mut self) -> Result<(), ControllerError> {
        if self.io_task.is_some() {
            return Err(ControllerError::AlreadyRunning);
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            ControllerError::StartFailed {
                reason: e.to_string(),
            }
        })?;

        let (transport, state) = self.parked.take().ok_or_else(|| ControllerError::StartFailed {
            reason: "transport was lost by a failed controller task".to_string(),
        })?;

        self.stop.store(false, Ordering::SeqCst);
        let io = IoLoop {
            transport,
            state,
            role: self.role,
            timing: self.timing,
            stop: self.stop.clone(),
            snapshot: self.snapshot.clone(),
            listeners: self.listeners.clone(),
            status_count: 0,
        };

        tracing::info!("Starting controller for {} as {:?}", self.endpoint, self.role);
        self.io_task = Some(runtime.spawn_blocking(move || io.run()));
        Ok(())
    }

    /// Stop the background loop and wait until the transport is closed
    pub async fn disconnect(&mut self) -> Result<(), ControllerError> {
        let handle = self.io_task.take().ok_or(ControllerError::NotRunning)?;
        self.stop.store(true, Ordering::SeqCst);

        match handle.await {
            Ok(parked) => {
                self.parked = Some(parked);
                tracing::info!("Controller for {} stopped", self.endpoint);
                Ok(())
            }
            Err(e) => {
                // Tables and transport died with the task; `connect` reports it
                self.snapshot.write().state = ConnectionState::Disconnected;
                tracing::error!("Controller task for {} failed: {}", self.endpoint, e);
                Err(ControllerError::TaskFailed {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Drop the cached value of `id` so its next observation is published
    pub fn force_update(&self, id: SensorId) {
        self.send(Request::ForceUpdate(id));
    }

    /// Bypass mode code: 0 auto, 1 open, 2 closed
    pub fn set_bypass_mode(&self, mode: i32) -> Result<(), ValidationError> {
        self.send(Request::Actuator(ActuatorCommand::bypass_mode(mode)?));
        Ok(())
    }

    /// Bypass temperature in °C, 18..=26
    pub fn set_bypass_temp(&self, temp: i32) -> Result<(), ValidationError> {
        self.send(Request::Actuator(ActuatorCommand::bypass_temp(temp)?));
        Ok(())
    }

    pub fn set_fan_speed(&self, supply: i32, extract: i32) -> Result<(), ValidationError> {
        self.send(Request::Actuator(ActuatorCommand::fan_speed(supply, extract)?));
        Ok(())
    }

    /// Vent mode code: 0 none, 1 fireplace, 2 open windows, 3 cooker hood
    pub fn set_vent_mode(&self, mode: i32) -> Result<(), ValidationError> {
        self.send(Request::Actuator(ActuatorCommand::vent_mode(mode)?));
        Ok(())
    }

    pub fn set_unit_on(&self, on: bool) {
        self.send(Request::Actuator(ActuatorCommand::unit_on(on)));
    }

    fn send(&self, request: Request) {
        if self.request_tx.send(request).is_err() {
            tracing::warn!("Dropped {:?}: controller state was lost", request);
        }
    }
}

impl Drop for IzziController {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// The loop itself, moved onto the blocking worker
struct IoLoop {
    transport: Box<dyn Transport>,
    state: LoopState,
    role: Role,
    timing: ControllerTiming,
    stop: Arc<AtomicBool>,
    snapshot: Arc<RwLock<Snapshot>>,
    listeners: ListenerRegistry,
    status_count: u32,
}

impl IoLoop {
    fn run(mut self) -> Parked {
        while !self.stopped() {
            self.drain_requests();
            if !self.transport.is_connected() && !self.open() {
                continue;
            }

            match self.transport.read_frame(self.timing.read_timeout) {
                Ok(Some(frame)) => {
                    let handled = catch_unwind(AssertUnwindSafe(|| self.handle_frame(frame)));
                    if handled.is_err() {
                        tracing::error!("Handling frame {} panicked", frame.to_hex());
                    }
                }
                Ok(None) => {
                    self.drop_connection("no frame within read timeout");
                    continue;
                }
                Err(e) => {
                    self.drop_connection(&e.to_string());
                    continue;
                }
            }

            if self.status_count >= STATUS_FRAMES_PER_WRITE {
                self.status_count = 0;
                if self.role.transmits() {
                    self.transmit();
                }
            }
        }

        self.transport.disconnect();
        self.set_state(ConnectionState::Disconnected);
        (self.transport, self.state)
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn open(&mut self) -> bool {
        self.set_state(ConnectionState::Connecting);
        match self.transport.connect() {
            Ok(()) => {
                self.status_count = 0;
                self.set_state(ConnectionState::Synchronized);
                tracing::info!("Synchronized with {}", self.transport.endpoint());
                true
            }
            Err(e) => {
                tracing::warn!("Connect to {} failed: {}", self.transport.endpoint(), e);
                self.set_state(ConnectionState::Disconnected);
                self.sleep(self.timing.reconnect_backoff);
                false
            }
        }
    }

    fn drop_connection(&mut self, reason: &str) {
        tracing::warn!(
            "Lost {}: {}; retrying in {:?}",
            self.transport.endpoint(),
            reason,
            self.timing.reconnect_backoff
        );
        self.transport.disconnect();
        self.set_state(ConnectionState::Disconnected);
        self.sleep(self.timing.reconnect_backoff);
    }

    fn handle_frame(&mut self, frame: Frame) {
        let mut changed = Vec::new();
        self.drain_requests();

        match frame.kind() {
            FrameKind::Status => {
                changed.extend(self.state.sensors.apply_status_frame(&frame));
                if let Err(e) = self.state.virtuals.update_efficiency(&self.state.sensors) {
                    tracing::debug!("Efficiency unavailable: {}", e);
                }
                self.status_count += 1;
            }
            FrameKind::Command if self.role == Role::Slave => {
                tracing::debug!("Observed command frame {}", frame.to_hex());
                self.state.actuators.observe_command_frame(&frame);
            }
            FrameKind::Command => {}
            FrameKind::Unknown => tracing::debug!("Ignoring unclassified frame {}", frame.to_hex()),
        }

        changed.extend(self.state.actuators.reconcile(&mut self.state.buffer));
        changed.extend(self.state.virtuals.reconcile());

        let mut published = Vec::with_capacity(changed.len());
        for id in changed {
            if !published.contains(&id) {
                self.publish(id);
                published.push(id);
            }
        }
    }

    fn drain_requests(&mut self) {
        while let Ok(request) = self.state.requests.try_recv() {
            match request {
                Request::Actuator(command) => {
                    tracing::debug!("Applying {:?}", command);
                    if let ActuatorCommand::VentMode(mode) = command {
                        self.state.virtuals.set_vent_mode(mode);
                    }
                    self.state.actuators.apply(command);
                }
                Request::ForceUpdate(id) => {
                    let known = self.state.sensors.reset(id)
                        || self.state.actuators.reset(id)
                        || self.state.virtuals.reset(id);
                    if !known {
                        tracing::debug!("Force update of {} has no cached value", id);
                    }
                }
            }
        }
    }

    fn current_value(&self, id: SensorId) -> SensorValue {
        match id.kind() {
            SensorKind::Sensor => self.state.sensors.value(id).into(),
            SensorKind::Actuator => self.state.actuators.published(id).into(),
            SensorKind::Virtual => self
                .state
                .virtuals
                .target(id)
                .unwrap_or(SensorValue::Unavailable),
            SensorKind::Host => SensorValue::Unavailable,
        }
    }

    fn publish(&self, id: SensorId) {
        let value = self.current_value(id);
        tracing::debug!("{} = {}", id, value);
        self.snapshot.write().values.insert(id, value);
        let failed = self.listeners.notify(id, value);
        if failed > 0 {
            tracing::warn!("{} listener(s) failed on {}", failed, id);
        }
    }

    fn transmit(&mut self) {
        self.sleep(self.timing.write_pacing);
        if let Err(e) = self.transport.write_frame(&self.state.buffer) {
            self.drop_connection(&e.to_string());
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.snapshot.write().state = state;
    }

    /// Sleep in short slices so a stop request cuts the wait short
    fn sleep(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.stopped() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(STOP_POLL_INTERVAL));
        }
    }
}
