use std::time::Duration;
use tonelink_core::framing::{build_header, build_packet, bytes_to_nibbles};
use tonelink_core::tones::tone_table;
use tonelink_core::{
    DecodeError, Listener, ModemConfig, Packet, PacketType, Payload, ReceiverEvent, ReceiverState,
    ScheduledTone, ToneChannel, TransmissionPlan, Transmitter, DEFAULT_TONE_GAIN, FADE_DURATION,
    PREAMBLE_FREQUENCY_HZ,
};

/// Preamble and guard as the transmitter sends them, then one slot per
/// entry: a data tone for `Some(nibble)`, silence for `None`
fn plan_from_slots(config: &ModemConfig, slots: &[Option<u8>]) -> TransmissionPlan {
    let table = tone_table(config);
    let symbol = config.symbol_duration;
    let data_start = config.preamble_duration() + config.guard_gap();

    let mut tones = vec![ScheduledTone {
        frequency: PREAMBLE_FREQUENCY_HZ,
        start: Duration::ZERO,
        duration: config.preamble_duration(),
        gain: DEFAULT_TONE_GAIN,
        ramp: FADE_DURATION,
    }];
    for (i, slot) in slots.iter().enumerate() {
        if let Some(nibble) = slot {
            tones.push(ScheduledTone {
                frequency: table[*nibble as usize],
                start: data_start + symbol * i as u32,
                duration: config.tone_duration(),
                gain: DEFAULT_TONE_GAIN,
                ramp: FADE_DURATION,
            });
        }
    }

    TransmissionPlan {
        tones,
        total: data_start + symbol * slots.len() as u32,
        nibbles: slots.iter().flatten().copied().collect(),
    }
}

fn slots(nibbles: &[u8]) -> Vec<Option<u8>> {
    nibbles.iter().copied().map(Some).collect()
}

/// Tick the listener until `until`, recording when each event fired
fn listen(
    config: &ModemConfig,
    channel: ToneChannel,
    until: Duration,
) -> (Listener<ToneChannel>, Vec<(Duration, ReceiverEvent)>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut listener = Listener::new(channel.with_tail(until));
    let mut events = Vec::new();
    listener.start(config, &mut events).unwrap();

    let mut timed: Vec<(Duration, ReceiverEvent)> =
        events.drain(..).map(|event| (Duration::ZERO, event)).collect();
    let interval = config.tick_interval();
    let mut k = 0u32;
    while interval * k <= until {
        let now = interval * k;
        listener.tick(config, now, &mut events);
        timed.extend(events.drain(..).map(|event| (now, event)));
        k += 1;
    }
    (listener, timed)
}

fn kinds(events: &[(Duration, ReceiverEvent)]) -> Vec<ReceiverEvent> {
    events.iter().map(|(_, event)| event.clone()).collect()
}

#[test]
fn test_timeout_after_45_seconds_of_data() {
    let config = ModemConfig {
        symbol_duration: Duration::from_secs(1),
        ..ModemConfig::default()
    };
    // one tone every fourth window: never enough silence to finalize
    let sparse: Vec<Option<u8>> = (0..56).map(|i| (i % 4 == 0).then_some(3)).collect();
    let mut channel = ToneChannel::new();
    channel.transmit(&plan_from_slots(&config, &sparse), Duration::ZERO);

    let (listener, events) = listen(&config, channel, Duration::from_secs(52));

    let timeouts: Vec<Duration> = events
        .iter()
        .filter(|(_, event)| *event == ReceiverEvent::Failed(DecodeError::Timeout))
        .map(|(at, _)| *at)
        .collect();
    assert_eq!(timeouts.len(), 1);
    // DATA began at 4.2 s
    assert!(timeouts[0] > Duration::from_millis(49_200));
    assert!(timeouts[0] <= Duration::from_millis(49_400));

    let kinds = kinds(&events);
    assert_eq!(
        &kinds[..3],
        &[
            ReceiverEvent::Listening,
            ReceiverEvent::PreambleDetected,
            ReceiverEvent::ReceivingData
        ]
    );
    assert!(!kinds.iter().any(|e| matches!(e, ReceiverEvent::Decoded(_))));
    assert_eq!(kinds.last(), Some(&ReceiverEvent::WaitingForPreamble));
    assert_eq!(listener.state(), Some(ReceiverState::Idle));
}

#[test]
fn test_false_preamble_abandoned_silently() {
    let config = ModemConfig::default();
    let mut channel = ToneChannel::new();
    channel.transmit(&plan_from_slots(&config, &[]), Duration::from_millis(50));

    let (listener, events) = listen(&config, channel, Duration::from_secs(4));

    assert_eq!(
        kinds(&events),
        vec![
            ReceiverEvent::Listening,
            ReceiverEvent::PreambleDetected,
            ReceiverEvent::ReceivingData,
            ReceiverEvent::Listening,
        ]
    );
    assert_eq!(listener.state(), Some(ReceiverState::Idle));
}

#[test]
fn test_stalled_partial_reports_incomplete() {
    let config = ModemConfig::default();
    let nibbles = [4, 1, 4, 3, 5, 3, 5, 4, 5, 4];
    let mut channel = ToneChannel::new();
    channel.transmit(&plan_from_slots(&config, &slots(&nibbles)), Duration::ZERO);

    let (_, events) = listen(&config, channel, Duration::from_secs(6));

    assert_eq!(
        kinds(&events),
        vec![
            ReceiverEvent::Listening,
            ReceiverEvent::PreambleDetected,
            ReceiverEvent::ReceivingData,
            ReceiverEvent::Failed(DecodeError::Incomplete { nibbles: 10 }),
            ReceiverEvent::WaitingForPreamble,
        ]
    );
}

#[test]
fn test_trailing_silence_finalizes_short_packet() {
    let config = ModemConfig::default();
    // header claims 20 bytes, only 5 are sent
    let header = build_header(PacketType::Text, 20, 0, 0);
    let nibbles = bytes_to_nibbles(&build_packet(&header, b"short"));
    let mut channel = ToneChannel::new();
    channel.transmit(&plan_from_slots(&config, &slots(&nibbles)), Duration::from_millis(7));

    let (_, events) = listen(&config, channel, Duration::from_secs(10));
    let kinds = kinds(&events);

    assert!(kinds.contains(&ReceiverEvent::Decoded(Packet::Text {
        text: "short".into()
    })));
    let last_progress = kinds.iter().rev().find_map(|event| match event {
        ReceiverEvent::Progress {
            received_bytes,
            expected_bytes,
            ..
        } => Some((*received_bytes, *expected_bytes)),
        _ => None,
    });
    assert_eq!(last_progress, Some((21, 36)));
}

#[test]
fn test_bad_magic_reported_after_silence() {
    let config = ModemConfig::default();
    let mut packet = build_packet(&build_header(PacketType::Text, 2, 0, 0), b"hi");
    packet[1] = b'X';
    let mut channel = ToneChannel::new();
    channel.transmit(
        &plan_from_slots(&config, &slots(&bytes_to_nibbles(&packet))),
        Duration::ZERO,
    );

    let (_, events) = listen(&config, channel, Duration::from_secs(8));
    let kinds = kinds(&events);

    assert!(kinds.contains(&ReceiverEvent::Failed(DecodeError::BadHeader)));
    // no header, no progress
    assert!(!kinds
        .iter()
        .any(|e| matches!(e, ReceiverEvent::Progress { .. })));
}

#[test]
fn test_short_preamble_blip_ignored() {
    let config = ModemConfig::default();
    let blip = TransmissionPlan {
        tones: vec![ScheduledTone {
            frequency: PREAMBLE_FREQUENCY_HZ,
            start: Duration::from_millis(100),
            duration: Duration::from_millis(60),
            gain: DEFAULT_TONE_GAIN,
            ramp: FADE_DURATION,
        }],
        total: Duration::from_millis(160),
        nibbles: Vec::new(),
    };
    let mut channel = ToneChannel::new();
    channel.transmit(&blip, Duration::ZERO);

    let (listener, events) = listen(&config, channel, Duration::from_secs(2));
    assert_eq!(kinds(&events), vec![ReceiverEvent::Listening]);
    assert_eq!(listener.state(), Some(ReceiverState::Idle));
}

#[test]
fn test_config_change_between_packets() {
    let first_config = ModemConfig::default();
    let second_config = ModemConfig {
        base_frequency: 1500.0,
        spacing: 100.0,
        ..first_config
    };
    let first = Transmitter::new(first_config)
        .unwrap()
        .plan(&Payload::Text("A".into()))
        .unwrap();
    let second = Transmitter::new(second_config)
        .unwrap()
        .plan(&Payload::Text("B".into()))
        .unwrap();

    let switch_at = first.total + Duration::from_secs(2);
    let second_at = switch_at + Duration::from_secs(1);
    let until = second_at + second.total + Duration::from_secs(1);

    let mut channel = ToneChannel::new().with_tail(Duration::from_secs(2));
    channel.transmit(&first, Duration::ZERO);
    channel.transmit(&second, second_at);

    let mut listener = Listener::new(channel);
    let mut events = Vec::new();
    listener.start(&first_config, &mut events).unwrap();

    let interval = first_config.tick_interval();
    let mut k = 0u32;
    while interval * k <= until {
        let now = interval * k;
        let config = if now < switch_at {
            &first_config
        } else {
            &second_config
        };
        listener.tick(config, now, &mut events);
        k += 1;
    }

    let texts: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            ReceiverEvent::Decoded(Packet::Text { text }) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["A", "B"]);
}
