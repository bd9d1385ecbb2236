//! Service-level PM pipeline runs: frames in through the mock UART,
//! events and averages out through the service accessors.

use airsense::app::events::AppEvent;
use airsense::app::service::AppService;
use airsense::config::SystemConfig;
use airsense::error::AverageError;
use airsense::sensors::pm::{Channel, FRAME_LEN, FRAME_MAGIC, RING_CAPACITY};

use crate::mock_hw::{MockHardware, RecordingSink};

/// Wire-correct frame with the given atmospheric mass values.
fn frame(pm1_0: u16, pm2_5: u16, pm10: u16) -> [u8; FRAME_LEN] {
    let fields: [u16; 13] = [28, 1, 2, 3, pm1_0, pm2_5, pm10, 500, 400, 300, 200, 100, 50];
    let mut buf = [0u8; FRAME_LEN];
    buf[0] = FRAME_MAGIC[0];
    buf[1] = FRAME_MAGIC[1];
    for (i, f) in fields.iter().enumerate() {
        buf[2 + 2 * i..4 + 2 * i].copy_from_slice(&f.to_be_bytes());
    }
    let sum: u16 = buf[..FRAME_LEN - 2].iter().map(|&b| u16::from(b)).sum();
    buf[FRAME_LEN - 2..].copy_from_slice(&sum.to_be_bytes());
    buf
}

fn setup() -> (AppService, MockHardware, RecordingSink) {
    (
        AppService::new(SystemConfig::default()),
        MockHardware::new(0),
        RecordingSink::new(),
    )
}

#[test]
fn frames_raise_events_and_fill_averages() {
    let (mut service, mut hw, mut sink) = setup();
    hw.feed_uart(&frame(10, 20, 30));
    hw.feed_uart(&frame(20, 30, 40));

    // Past warm-up: both frames enter the averaging ring.
    assert_eq!(service.on_pm_data(&mut hw, 60.0, &mut sink), 2);
    assert_eq!(sink.count(AppEvent::PmFrame), 2);

    assert_eq!(service.pm_average(Channel::Pm1_0, 10), Ok(Some(15.0)));
    assert_eq!(service.pm_average(Channel::Pm2_5, 10), Ok(Some(25.0)));
    assert_eq!(service.pm_average(Channel::Pm10, 1), Ok(Some(40.0)));

    let last = service.last_pm_frame().expect("frame cached");
    assert_eq!(last.atm_pm1_0, 20);
    assert_eq!(last.particles_0_3um, 500);
}

#[test]
fn warmup_frames_show_instantly_but_do_not_average() {
    let (mut service, mut hw, mut sink) = setup();
    hw.feed_uart(&frame(10, 20, 30));

    // Before the 30 s warm-up gate.
    assert_eq!(service.on_pm_data(&mut hw, 3.0, &mut sink), 1);
    assert_eq!(sink.count(AppEvent::PmFrame), 1);
    assert!(service.last_pm_frame().is_some());
    assert_eq!(service.pm_average(Channel::Pm1_0, 10), Ok(None));
}

#[test]
fn corrupt_frame_raises_nothing() {
    let (mut service, mut hw, mut sink) = setup();
    let mut bad = frame(10, 20, 30);
    bad[12] ^= 0x04;
    hw.feed_uart(&bad);

    assert_eq!(service.on_pm_data(&mut hw, 60.0, &mut sink), 0);
    assert_eq!(sink.count(AppEvent::PmFrame), 0);
    assert!(service.last_pm_frame().is_none());
}

#[test]
fn stream_with_junk_between_frames_recovers() {
    let (mut service, mut hw, mut sink) = setup();
    hw.feed_uart(&frame(1, 2, 3));
    hw.feed_uart(&[0x00, 0x21, 0x3A]); // line noise between frames
    hw.feed_uart(&frame(4, 5, 6));

    assert_eq!(service.on_pm_data(&mut hw, 60.0, &mut sink), 2);
    assert_eq!(service.last_pm_frame().unwrap().atm_pm1_0, 4);
}

#[test]
fn oversized_average_request_is_a_distinct_error() {
    let (service, _, _) = setup();
    assert_eq!(
        service.pm_average(Channel::Pm10, RING_CAPACITY + 1),
        Err(AverageError::TooManyPoints)
    );
}

#[test]
fn partial_frame_waits_for_more_bytes() {
    let (mut service, mut hw, mut sink) = setup();
    let full = frame(10, 20, 30);
    hw.feed_uart(&full[..20]);
    assert_eq!(service.on_pm_data(&mut hw, 60.0, &mut sink), 0);

    hw.feed_uart(&full[20..]);
    assert_eq!(service.on_pm_data(&mut hw, 60.0, &mut sink), 1);
    assert_eq!(service.last_pm_frame().unwrap().atm_pm2_5, 20);
}
