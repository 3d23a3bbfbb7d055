//! End-to-end acquisition against a simulated sensor board

mod common;

use capdac_logger::persist::write_csv;
use capdac_logger::{acquire_async, SerialSettings};
use common::*;

fn config(capdac: i64, rate: f64, duration: f64) -> SessionConfig {
    SessionConfig {
        capdac,
        duration_s: duration,
        sampling_rate_hz: rate,
        ..SessionConfig::default()
    }
}

#[test]
fn test_80hz_one_second_at_capdac_2() {
    let stream = frames((0..80).map(|i| (1000 + 100 * i, 0)));
    assert_eq!(stream.len(), 640);
    let mut device = SimDevice {
        chunk: 50,
        ..SimDevice::streaming(stream)
    };
    let session = AcquisitionSession::new(config(2, 80.0, 1.0)).unwrap();
    assert_eq!(session.sample_count(), 80);
    assert_eq!(session.expected_bytes(), 640);

    let result = session.run(&mut device, &mut NoPacer).unwrap();

    assert_eq!(
        device.commands,
        vec![
            (0, "2".to_string()),
            (1, "80".to_string()),
            (2, "S".to_string()),
        ]
    );
    assert_eq!(result.samples.len(), 80);
    assert_eq!(result.bytes_received, 640);
    assert!(result.whole_frames);
    for (i, sample) in result.samples.iter().enumerate() {
        assert_eq!(sample.relative_timestamp, 100 * i as i64);
        assert_eq!(sample.capacitance_pf, 6.25);
    }
    assert_eq!(result.metadata.capdac, 2);
}

#[test]
fn test_negative_full_scale_reading() {
    let stream = frames([(5, -524288), (10, -524288)]);
    let mut device = SimDevice::streaming(stream);
    let session = AcquisitionSession::new(config(0, 2.0, 1.0)).unwrap();

    let result = session.run(&mut device, &mut NoPacer).unwrap();

    let pf: Vec<f64> = result.samples.iter().map(|s| s.capacitance_pf).collect();
    assert_eq!(pf, vec![-1.0, -1.0]);
}

#[test]
fn test_out_of_range_capdac_is_clamped_on_the_wire_and_in_the_formula() {
    for (requested, sent) in [(99, 31u8), (-5, 0u8)] {
        let mut device = SimDevice::streaming(frames([(0, 0)]));
        let session = AcquisitionSession::new(config(requested, 1.0, 1.0)).unwrap();

        let result = session.run(&mut device, &mut NoPacer).unwrap();

        assert_eq!(device.commands[0], (0, sent.to_string()));
        assert_eq!(result.samples[0].capacitance_pf, sent as f64 * 3.125);
    }
}

#[test]
fn test_failed_handshake_aborts_remaining_steps() {
    let mut device = SimDevice {
        mute_on: Some(1),
        ..SimDevice::streaming(frames([(0, 0)]))
    };
    let session = AcquisitionSession::new(config(0, 1.0, 1.0)).unwrap();

    let err = session.run(&mut device, &mut NoPacer).unwrap_err();

    assert!(matches!(
        err,
        DriverError::ProtocolTimeout {
            phase: AckPhase::Echo,
            expected: 1,
            ..
        }
    ));
    // CAPDAC completed, sample count announced, start trigger never sent.
    assert_eq!(device.commands, vec![(0, "0".to_string())]);
    assert_eq!(device.written(), vec![0u8, b'0', 1u8]);
}

#[test]
fn test_short_stream_surfaces_partial_buffer() {
    // Device sends 2.5 frames instead of 4.
    let mut stream = frames([(0, 1), (1, 2)]);
    stream.extend_from_slice(&[0xAA; 4]);
    let mut device = SimDevice::streaming(stream.clone());
    let session = AcquisitionSession::new(config(0, 4.0, 1.0)).unwrap();

    let err = session.run(&mut device, &mut NoPacer).unwrap_err();

    match &err {
        DriverError::BulkReadTimeout { expected, partial } => {
            assert_eq!(*expected, 32);
            assert_eq!(partial, &stream);
        }
        other => panic!("Expected BulkReadTimeout, got: {:?}", other),
    }
}

#[test]
fn test_invalid_rate_is_rejected_before_any_io() {
    let err = AcquisitionSession::new(config(0, -200.0, 60.0)).unwrap_err();
    assert!(matches!(err, DriverError::InvalidConfig(_)));
}

#[test]
fn test_session_result_to_csv() {
    let mut device = SimDevice::streaming(frames([(1000, 0), (1100, 262144)]));
    let session = AcquisitionSession::new(config(1, 2.0, 1.0)).unwrap();
    let result = session.run(&mut device, &mut NoPacer).unwrap();

    let mut out = Vec::new();
    write_csv(&mut out, &result).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.starts_with("Data Collection Duration (s):,1,\n"));
    assert!(text.contains("CAPDAC:,1,\n"));
    assert!(text.ends_with("1,0,3.125\n2,100,3.625\n"));
}

#[test]
fn test_half_step_readings_round_to_even() {
    // 16384 counts = 0.03125 pF, 49152 counts = 0.09375 pF.
    let stream = frames([(0, 16384), (10, 49152), (20, -16384)]);
    let mut device = SimDevice::streaming(stream);
    let session = AcquisitionSession::new(config(1, 3.0, 1.0)).unwrap();

    let result = session.run(&mut device, &mut NoPacer).unwrap();

    let pf: Vec<f64> = result.samples.iter().map(|s| s.capacitance_pf).collect();
    assert_eq!(pf, vec![3.1562, 3.2188, 3.0938]);

    let mut out = Vec::new();
    write_csv(&mut out, &result).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.ends_with("1,0,3.1562\n2,10,3.2188\n3,20,3.0938\n"));
}

#[tokio::test]
async fn test_async_acquire_reports_missing_port() {
    let settings = SerialSettings::new("/dev/capdac-logger-no-such-port");

    let err = acquire_async(settings, SessionConfig::default())
        .await
        .unwrap_err();

    match err {
        DriverError::TransportOpen { port, .. } => {
            assert_eq!(port, "/dev/capdac-logger-no-such-port")
        }
        other => panic!("Expected TransportOpen, got: {:?}", other),
    }
}
