use izzifast::{
    BypassMode, Config, ControllerTiming, IzziController, IzzifastBridge, Role, SensorEvent,
    SensorId, SensorValue, Transport, ValidationError, VentMode,
};
use izzifast_communication::firmware::izzi::constants::*;
use izzifast_communication::{Frame, TransportResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Replays status frames and records every written frame
#[derive(Clone, Default)]
struct FakeUnit {
    pending: Arc<Mutex<VecDeque<Frame>>>,
    written: Arc<Mutex<Vec<Frame>>>,
}

struct FakeTransport {
    unit: FakeUnit,
    connected: bool,
}

impl Transport for FakeTransport {
    fn connect(&mut self) -> TransportResult<()> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn read_frame(&mut self, timeout: Duration) -> TransportResult<Option<Frame>> {
        let next = self.unit.pending.lock().pop_front();
        match next {
            Some(frame) => Ok(Some(frame)),
            None => {
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }

    fn write_frame(&mut self, frame: &Frame) -> TransportResult<()> {
        self.unit.written.lock().push(*frame);
        Ok(())
    }

    fn endpoint(&self) -> String {
        "fake-unit".to_string()
    }
}

fn status_frame() -> Frame {
    let mut frame = Frame::new([0u8; FRAME_LEN]);
    frame.set(FRAME_ID_INDEX, STATUS_FRAME_ID);
    frame.set(STATUS_OUTDOOR_TEMP_INDEX, 2);
    frame.set(STATUS_SUPPLY_TEMP_INDEX, 17);
    frame.set(STATUS_EXTRACT_TEMP_INDEX, 22);
    frame
}

fn bridge(config: &Config) -> (IzzifastBridge, FakeUnit) {
    let unit = FakeUnit::default();
    let transport = Box::new(FakeTransport {
        unit: unit.clone(),
        connected: false,
    });
    let timing = ControllerTiming {
        read_timeout: Duration::from_millis(20),
        reconnect_backoff: Duration::from_millis(5),
        write_pacing: Duration::from_millis(1),
    };
    let controller = IzziController::with_timing(transport, config.role, timing);
    (IzzifastBridge::with_controller(config, controller), unit)
}

async fn wait_for_write(unit: &FakeUnit) -> Frame {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(frame) = unit.written.lock().first().copied() {
            return frame;
        }
        assert!(Instant::now() < deadline, "no frame written");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn drain(events: &mut broadcast::Receiver<SensorEvent>) -> Vec<SensorEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

#[tokio::test]
async fn test_startup_settings_and_fan_percentage_reach_the_bus() {
    let config = Config {
        extract_correction: 10,
        bypass_temp: 21,
        bypass_mode: BypassMode::Open,
        ..Config::default()
    };
    let (mut bridge, unit) = bridge(&config);
    let mut events = bridge.subscribe();

    bridge.set_percentage(50).unwrap();
    unit.pending.lock().extend([status_frame(), status_frame()]);
    bridge.connect().await.unwrap();

    let frame = wait_for_write(&unit).await;
    bridge.disconnect().await.unwrap();

    assert_eq!(frame.u8_at(CMD_SUPPLY_FAN_SPEED_INDEX), 45);
    assert_eq!(frame.u8_at(CMD_EXTRACT_FAN_SPEED_INDEX), 50);
    assert_eq!(frame.u8_at(CMD_UNIT_STATE_INDEX), CMD_UNIT_STATE_ON);
    assert_eq!(frame.u8_at(CMD_BYPASS_TEMP_INDEX), 21);
    assert_eq!(frame.u8_at(CMD_BYPASS_MODE_INDEX), BypassMode::Open.code());

    let seen = drain(&mut events);
    assert!(seen.contains(&SensorEvent {
        id: SensorId::FanMode,
        value: SensorValue::Value(50),
    }));
    assert!(seen.contains(&SensorEvent {
        id: SensorId::ExtractCorrection,
        value: SensorValue::Value(10),
    }));
    assert!(seen.contains(&SensorEvent {
        id: SensorId::OutdoorTemperature,
        value: SensorValue::Value(2),
    }));
    // (17 - 2) / (22 - 2) * 100
    assert_eq!(bridge.value(SensorId::Efficiency), Some(SensorValue::Value(75)));
}

#[tokio::test]
async fn test_rejected_startup_temperature_keeps_default() {
    // 17 passes config validation but not the controller's window
    let config = Config {
        bypass_temp: 17,
        ..Config::default()
    };
    let (mut bridge, unit) = bridge(&config);
    unit.pending.lock().extend([status_frame(), status_frame()]);
    bridge.connect().await.unwrap();

    let frame = wait_for_write(&unit).await;
    bridge.disconnect().await.unwrap();
    assert_eq!(
        frame.u8_at(CMD_BYPASS_TEMP_INDEX),
        DEFAULT_COMMAND_FRAME[CMD_BYPASS_TEMP_INDEX]
    );
}

#[tokio::test]
async fn test_slave_bridge_never_writes() {
    let config = Config {
        role: Role::Slave,
        ..Config::default()
    };
    let (mut bridge, unit) = bridge(&config);
    unit.pending
        .lock()
        .extend([status_frame(), status_frame(), status_frame()]);
    bridge.connect().await.unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while bridge.value(SensorId::Efficiency).is_none() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    bridge.disconnect().await.unwrap();

    assert!(unit.written.lock().is_empty());
    assert_eq!(bridge.controller().role(), Role::Slave);
}

#[test]
fn test_fan_percentage_window() {
    let (bridge, _unit) = bridge(&Config::default());
    assert_eq!(
        bridge.set_fan_speed(19),
        Err(ValidationError::FanPercentage(19))
    );
    assert_eq!(
        bridge.set_fan_speed(101),
        Err(ValidationError::FanPercentage(101))
    );
    assert!(bridge.set_fan_speed(20).is_ok());
    assert!(bridge.set_percentage(10).is_err());
    assert!(!bridge.is_on());
}

#[test]
fn test_percentage_zero_turns_off_and_is_published() {
    let (bridge, _unit) = bridge(&Config::default());
    let mut events = bridge.subscribe();
    bridge.set_percentage(0).unwrap();
    assert!(bridge.is_on());
    assert_eq!(bridge.value(SensorId::FanMode), Some(SensorValue::Value(0)));

    bridge.turn_on(None).unwrap();
    assert_eq!(bridge.value(SensorId::FanMode), Some(SensorValue::Value(40)));
    assert_eq!(drain(&mut events).len(), 2);
}

#[test]
fn test_force_update_republishes_host_value() {
    let (bridge, _unit) = bridge(&Config::default());
    bridge.turn_on(Some(60)).unwrap();
    let mut events = bridge.subscribe();
    bridge.force_update(SensorId::FanMode);
    assert_eq!(
        drain(&mut events),
        vec![SensorEvent {
            id: SensorId::FanMode,
            value: SensorValue::Value(60),
        }]
    );
}

#[test]
fn test_mode_names() {
    let (bridge, _unit) = bridge(&Config::default());
    assert!(bridge.set_bypass_mode_name("closed").is_ok());
    assert!(matches!(
        bridge.set_bypass_mode_name("sometimes"),
        Err(ValidationError::UnknownName { .. })
    ));
    assert!(bridge.set_vent_mode_name("open windows").is_ok());
    assert!(bridge.set_vent_mode(VentMode::CookerHood).is_ok());
    assert!(bridge.set_vent_mode_name("sauna").is_err());
    assert_eq!(bridge.unique_id(), "_iZZi_300_ERV_FE");
    assert_eq!(bridge.name(), "iZZi ERV 300");
}

#[test]
fn test_bridge_from_config_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("izzifast.toml");
    std::fs::write(
        &path,
        r#"
name = "Attic ERV"
extract_correction = -5
role = "slave"

[connection]
type = "tcp"
host = "192.168.1.40"
"#,
    )
    .unwrap();

    let config = Config::load_from_file(&path).unwrap();
    let bridge = IzzifastBridge::from_config(&config).unwrap();
    assert_eq!(bridge.name(), "Attic ERV");
    assert_eq!(bridge.extract_correction(), -5);
    assert_eq!(bridge.controller().endpoint(), "192.168.1.40:8234");
    assert_eq!(bridge.controller().role(), Role::Slave);
    assert!(!bridge.controller().is_running());
}
