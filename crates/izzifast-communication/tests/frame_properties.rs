use izzifast_communication::firmware::izzi::constants::*;
use izzifast_communication::firmware::izzi::{
    ActuatorTable, Frame, FrameKind, SensorTable, VirtualTable,
};
use izzifast_core::{SensorId, SensorValue};
use proptest::prelude::*;

fn any_frame() -> impl Strategy<Value = Frame> {
    prop::array::uniform15(any::<u8>()).prop_map(Frame::new)
}

fn status_frame() -> impl Strategy<Value = Frame> {
    any_frame().prop_map(|mut frame| {
        frame.set(FRAME_ID_INDEX, STATUS_FRAME_ID);
        frame
    })
}

proptest! {
    #[test]
    fn classify_is_deterministic(frame in any_frame()) {
        let copy = Frame::new(*frame.as_bytes());
        prop_assert_eq!(frame.kind(), copy.kind());
    }

    #[test]
    fn classify_reads_only_the_discriminator(frame in any_frame(), index in 1usize..FRAME_LEN, byte in any::<u8>()) {
        let mut other = frame;
        other.set(index, byte);
        prop_assert_eq!(frame.kind(), other.kind());
    }

    #[test]
    fn classify_is_total(id in any::<u8>()) {
        let expected = match id {
            STATUS_FRAME_ID => FrameKind::Status,
            COMMAND_FRAME_ID => FrameKind::Command,
            _ => FrameKind::Unknown,
        };
        prop_assert_eq!(FrameKind::from_discriminator(id), expected);
    }

    #[test]
    fn status_decoding_is_idempotent(frame in status_frame()) {
        let mut table = SensorTable::new();
        prop_assert_eq!(table.apply_status_frame(&frame).len(), table.entries().len());
        prop_assert!(table.apply_status_frame(&frame).is_empty());
    }

    #[test]
    fn reset_refires_unchanged_value(frame in status_frame()) {
        let mut table = SensorTable::new();
        table.apply_status_frame(&frame);
        table.reset(SensorId::ExhaustTemperature);
        prop_assert_eq!(table.apply_status_frame(&frame), vec![SensorId::ExhaustTemperature]);
    }

    #[test]
    fn temperatures_decode_signed(frame in status_frame()) {
        let mut table = SensorTable::new();
        table.apply_status_frame(&frame);
        let raw = frame.u8_at(STATUS_OUTDOOR_TEMP_INDEX) as i8;
        prop_assert_eq!(table.value(SensorId::OutdoorTemperature), Some(i32::from(raw)));
        prop_assert!(table.value(SensorId::BypassState).unwrap_or(-1) >= 0);
    }

    #[test]
    fn reconcile_reaches_a_fixed_point(supply in 0i32..=100, extract in 0i32..=100, mode in 0i32..=3) {
        let mut table = ActuatorTable::new();
        let mut buffer = Frame::new(DEFAULT_COMMAND_FRAME);
        table.set_fan_speed(supply, extract).unwrap();
        table.apply(izzifast_communication::ActuatorCommand::vent_mode(mode).unwrap());
        table.reconcile(&mut buffer);
        prop_assert!(table.reconcile(&mut buffer).is_empty());
        prop_assert!(buffer.u8_at(CMD_SUPPLY_FAN_SPEED_INDEX) <= 100);
    }

    #[test]
    fn efficiency_is_available_once_inputs_are_seen(frame in status_frame()) {
        let mut sensors = SensorTable::new();
        let mut virtuals = VirtualTable::new();
        sensors.apply_status_frame(&frame);
        prop_assert!(virtuals.update_efficiency(&sensors).is_ok());
        prop_assert!(matches!(virtuals.target(SensorId::Efficiency), Some(SensorValue::Value(_))));
    }
}
