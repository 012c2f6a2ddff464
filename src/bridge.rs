//! Host bridge
//!
//! Adapts the bus controller to a host: splits a single fan percentage into
//! supply and extract speeds using the configured correction, keeps the latest
//! value of every id and republishes changes on a broadcast channel.

use izzifast_communication::{
    open_transport, ConnectionDriver, ConnectionParams, IzziController, Transport,
};
use izzifast_core::{
    BypassMode, EventDispatcher, Result, SensorEvent, SensorId, SensorKind, SensorListener,
    SensorListenerHandle, SensorValue, ValidationError, VentMode,
};
use izzifast_settings::{Config, ConnectionType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Unique id the unit is exposed under
pub const UNIQUE_ID: &str = "_iZZi_300_ERV_FE";

/// Lowest fan percentage the host may request while the unit runs
pub const MIN_FAN_PERCENTAGE: i32 = 20;
/// Highest fan percentage
pub const MAX_FAN_PERCENTAGE: i32 = 100;
/// Percentage used by `turn_on` without an explicit speed
pub const DEFAULT_FAN_PERCENTAGE: i32 = 40;

/// Transport parameters for a configuration
pub fn connection_params(config: &Config) -> ConnectionParams {
    let connection = &config.connection;
    match connection.connection_type {
        ConnectionType::Tcp => ConnectionParams::tcp(
            connection.host.clone().unwrap_or_default(),
            connection.port,
        ),
        ConnectionType::Serial => {
            ConnectionParams::serial(connection.device.clone().unwrap_or_default())
        }
    }
}

/// Split a fan percentage into (supply, extract) speeds
///
/// A positive correction takes that share off the supply fan. Otherwise the
/// extract fan is adjusted by the correction, which raises it when negative.
pub fn split_fan_speed(percentage: i32, correction: i32) -> (i32, i32) {
    let adjustment = correction * percentage / 100;
    if correction > 0 {
        (percentage - adjustment, percentage)
    } else {
        (percentage, percentage - adjustment)
    }
}

/// Receives controller notifications, caches them and republishes them
struct Publisher {
    data: RwLock<HashMap<SensorId, SensorValue>>,
    events: EventDispatcher,
}

impl Publisher {
    fn publish(&self, id: SensorId, value: SensorValue) {
        self.data.write().insert(id, value);
        self.events.publish(SensorEvent { id, value });
    }
}

impl SensorListener for Publisher {
    fn on_sensor_changed(&self, id: SensorId, value: SensorValue) {
        tracing::debug!("Received update for {}: {}", id, value);
        self.publish(id, value);
    }
}

/// Host-facing facade over one [`IzziController`]
pub struct IzzifastBridge {
    name: String,
    extract_correction: i32,
    bypass_temp: i32,
    bypass_mode: BypassMode,
    controller: IzziController,
    publisher: Arc<Publisher>,
    listener: SensorListenerHandle,
}

impl IzzifastBridge {
    /// Build the transport the configuration names and wrap it
    pub fn from_config(config: &Config) -> Result<Self> {
        let params = connection_params(config);
        match params.driver {
            ConnectionDriver::Tcp => tracing::debug!("Setting up Ethernet bridge"),
            ConnectionDriver::Serial => tracing::debug!("Setting up serial bridge"),
        }
        let transport = open_transport(&params)?;
        Ok(Self::new(config, transport))
    }

    /// Wrap an already built transport
    pub fn new(config: &Config, transport: Box<dyn Transport>) -> Self {
        Self::with_controller(config, IzziController::new(transport, config.role))
    }

    /// Wrap an already built controller
    ///
    /// The configuration still supplies the name, correction and startup
    /// bypass settings; the controller's own role is kept.
    pub fn with_controller(config: &Config, controller: IzziController) -> Self {
        let publisher = Arc::new(Publisher {
            data: RwLock::new(HashMap::new()),
            events: EventDispatcher::default(),
        });
        let listener = controller.register_listener(publisher.clone());

        Self {
            name: config.name.clone(),
            extract_correction: config.extract_correction,
            bypass_temp: config.bypass_temp,
            bypass_mode: config.bypass_mode,
            controller,
            publisher,
            listener,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> &'static str {
        UNIQUE_ID
    }

    pub fn extract_correction(&self) -> i32 {
        self.extract_correction
    }

    pub fn controller(&self) -> &IzziController {
        &self.controller
    }

    /// Receive every published change from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SensorEvent> {
        self.publisher.events.subscribe()
    }

    /// Latest value the bridge has seen for `id`
    pub fn value(&self, id: SensorId) -> Option<SensorValue> {
        self.publisher.data.read().get(&id).copied()
    }

    pub fn values(&self) -> HashMap<SensorId, SensorValue> {
        self.publisher.data.read().clone()
    }

    /// Apply the configured startup settings and start the controller
    ///
    /// Rejected startup values are logged and skipped.
    pub async fn connect(&mut self) -> Result<()> {
        if let Err(e) = self.controller.set_bypass_temp(self.bypass_temp) {
            tracing::error!("Configured bypass temperature rejected: {}", e);
        }
        if let Err(e) = self.controller.set_bypass_mode(i32::from(self.bypass_mode.code())) {
            tracing::error!("Configured bypass mode rejected: {}", e);
        }
        self.publisher.publish(
            SensorId::ExtractCorrection,
            SensorValue::Value(self.extract_correction),
        );

        tracing::debug!("Connecting with bridge");
        self.controller.connect().await?;
        Ok(())
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        tracing::debug!("Disconnecting from bridge");
        self.controller.disconnect().await?;
        Ok(())
    }

    /// Republish `id` on its next observation
    ///
    /// Host-side values are republished immediately from the cache.
    pub fn force_update(&self, id: SensorId) {
        if id.kind() == SensorKind::Host {
            if let Some(value) = self.value(id) {
                self.publisher.publish(id, value);
            }
            return;
        }
        self.controller.force_update(id);
    }

    pub fn set_bypass_mode(&self, mode: BypassMode) -> std::result::Result<(), ValidationError> {
        self.controller.set_bypass_mode(i32::from(mode.code()))
    }

    /// Bypass mode by host name: "auto", "open" or "closed"
    pub fn set_bypass_mode_name(&self, name: &str) -> std::result::Result<(), ValidationError> {
        self.set_bypass_mode(name.parse()?)
    }

    pub fn set_bypass_temp(&self, temp: i32) -> std::result::Result<(), ValidationError> {
        self.controller.set_bypass_temp(temp)
    }

    pub fn set_vent_mode(&self, mode: VentMode) -> std::result::Result<(), ValidationError> {
        self.controller.set_vent_mode(i32::from(mode.code()))
    }

    /// Vent mode by host name: "none", "fireplace", "open windows", "cooker hood"
    pub fn set_vent_mode_name(&self, name: &str) -> std::result::Result<(), ValidationError> {
        self.set_vent_mode(name.parse()?)
    }

    pub fn set_fan_on(&self, on: bool) {
        self.controller.set_unit_on(on);
    }

    /// Set both fans from one percentage in 20..=100, applying the correction
    pub fn set_fan_speed(&self, percentage: i32) -> std::result::Result<(), ValidationError> {
        if !(MIN_FAN_PERCENTAGE..=MAX_FAN_PERCENTAGE).contains(&percentage) {
            return Err(ValidationError::FanPercentage(percentage));
        }
        let (supply, extract) = split_fan_speed(percentage, self.extract_correction);
        self.controller.set_fan_speed(supply, extract)
    }

    /// Fan entity percentage: 0 stops the unit, anything else runs it
    ///
    /// An accepted percentage is published as the fan mode.
    pub fn set_percentage(&self, percentage: i32) -> std::result::Result<(), ValidationError> {
        tracing::debug!("Changing fan percentage to {} %", percentage);
        let result = if percentage == 0 {
            self.set_fan_on(false);
            Ok(())
        } else {
            self.set_fan_speed(percentage)
                .map(|()| self.set_fan_on(true))
        };

        match result {
            Ok(()) => self
                .publisher
                .publish(SensorId::FanMode, SensorValue::Value(percentage)),
            Err(ref e) => tracing::error!("Fan percentage not accepted: {}", e),
        }
        result
    }

    /// Run the unit at `percentage`, or 40 % when none is given
    pub fn turn_on(&self, percentage: Option<i32>) -> std::result::Result<(), ValidationError> {
        self.set_percentage(percentage.unwrap_or(DEFAULT_FAN_PERCENTAGE))
    }

    pub fn turn_off(&self) {
        self.set_fan_on(false);
    }

    /// Whether the host has set a fan percentage yet
    pub fn is_on(&self) -> bool {
        self.value(SensorId::FanMode).is_some()
    }
}

impl Drop for IzzifastBridge {
    fn drop(&mut self) {
        self.controller.unregister_listener(&self.listener);
    }
}
