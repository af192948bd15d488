use carbus::canbus::BusFrame;
use carbus::someip::{MessagePayload, SomeIpMessage};
use carbus::store::{SharedStore, INBOX_CAPACITY};

fn detection_message(session: u16) -> SomeIpMessage {
    SomeIpMessage::new(
        0x1234,
        0x5678,
        0x0001,
        session,
        1,
        1,
        2,
        0,
        MessagePayload::Text(format!(r#"{{"distance": {session}, "object_type": "car"}}"#)),
    )
}

#[test]
fn test_frames_are_latest_value() {
    let store = SharedStore::new();

    store.put_frame(BusFrame {
        brake: 0,
        acceleration: 50,
        wheel: 0,
    });
    store.put_frame(BusFrame {
        brake: 120,
        acceleration: 0,
        wheel: 60,
    });

    let (frame, _) = store.snapshot();
    assert_eq!(
        frame,
        Some(BusFrame {
            brake: 120,
            acceleration: 0,
            wheel: 60
        })
    );

    // The snapshot consumed the frame; nothing is left for the next tick.
    let (frame, _) = store.snapshot();
    assert_eq!(frame, None);
}

#[test]
fn test_messages_are_fifo_one_per_snapshot() {
    let store = SharedStore::new();
    for session in 0..3 {
        store.push_message(detection_message(session));
    }
    assert_eq!(store.pending_messages(), 3);

    for expected in 0..3u16 {
        let (_, message) = store.snapshot();
        assert_eq!(message.map(|m| m.session_id), Some(expected));
    }
    let (_, message) = store.snapshot();
    assert!(message.is_none());
}

#[test]
fn test_full_inbox_evicts_oldest() {
    let store = SharedStore::new();
    let overflow = 6;

    for session in 0..(INBOX_CAPACITY + overflow) as u16 {
        store.push_message(detection_message(session));
    }

    assert_eq!(store.pending_messages(), INBOX_CAPACITY);
    assert_eq!(store.dropped_messages(), overflow as u64);

    // The oldest survivors are the ones pushed right after the evictions.
    let (_, message) = store.snapshot();
    assert_eq!(message.map(|m| m.session_id), Some(overflow as u16));
}

#[test]
fn test_snapshot_returns_both_sides_atomically() {
    let store = SharedStore::new();
    store.put_frame(BusFrame {
        brake: 5,
        acceleration: 200,
        wheel: 1,
    });
    store.push_message(detection_message(7));

    let (frame, message) = store.snapshot();
    assert!(frame.is_some());
    assert_eq!(message.map(|m| m.session_id), Some(7));
}
