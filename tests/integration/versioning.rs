//! Version negotiation: emitting and accepting legacy struct revisions.

use crate::structs::*;
use crate::*;
use strait_codec::Status;

#[test]
fn sender_converts_down_to_peer_revision_1() {
    // This build's PackedCounters is revision 3; the peer advertised 1.
    let value = PackedCounters {
        x: 500,
        y: 600,
        z: 700,
    };
    let bytes = encode_message(&value, CommonFlags::NONE, DataFlags::NONE, Some(1)).unwrap();

    // The receiver (same build, current revision 3) folds the legacy
    // layout back into the current one; fields revision 1 lacked default.
    let decoded: PackedCounters = decode_message(bytes.data()).unwrap();
    let (x, y, z) = (decoded.x, decoded.y, decoded.z);
    assert_eq!(x, 500);
    assert_eq!(y, 600);
    assert_eq!(z, 0);
}

#[test]
fn sender_converts_down_to_peer_revision_0() {
    let value = PackedCounters { x: 21, y: 115, z: 9 };
    let bytes = encode_message(&value, CommonFlags::NONE, DataFlags::NONE, Some(0)).unwrap();

    let decoded: PackedCounters = decode_message(bytes.data()).unwrap();
    let (x, y, z) = (decoded.x, decoded.y, decoded.z);
    assert_eq!(x, 21);
    assert_eq!(y, 115);
    assert_eq!(z, 0);
}

#[test]
fn conversion_survives_transform_flags() {
    let value = PackedCounters { x: 1, y: 2, z: 3 };
    for data in scalar_flag_combinations() {
        let bytes = encode_message(&value, CommonFlags::NONE, data, Some(1))
            .unwrap_or_else(|err| panic!("encode at revision 1 under {data:?}: {err}"));
        let decoded: PackedCounters = decode_message(bytes.data())
            .unwrap_or_else(|err| panic!("decode at revision 1 under {data:?}: {err}"));
        assert_eq!((decoded.x, decoded.y, decoded.z), (1, 2, 0));
    }
}

#[test]
fn peer_between_revisions_gets_the_next_lower_layout() {
    // Peer advertised 2; our history is [3, 1, 0], so revision 1 travels.
    let value = PackedCounters { x: 8, y: 9, z: 10 };
    let bytes = encode_message(&value, CommonFlags::NONE, DataFlags::NONE, Some(2)).unwrap();
    let decoded: PackedCounters = decode_message(bytes.data()).unwrap();
    assert_eq!((decoded.x, decoded.y, decoded.z), (8, 9, 0));
}

#[test]
fn peer_older_than_history_is_refused() {
    // EchoRequest's history stops at revision 1.
    let value = EchoRequest {
        text: "hi".to_string(),
        seq: 4,
    };
    assert_eq!(
        encode_message(&value, CommonFlags::NONE, DataFlags::NONE, Some(0)),
        Err(Status::ErrorNotSupportedInterfaceVersion)
    );
}

#[test]
fn version_above_current_is_refused() {
    let value = PackedCounters::default();
    assert_eq!(
        encode_message(&value, CommonFlags::NONE, DataFlags::NONE, Some(9)),
        Err(Status::ErrorNotSupportedInterfaceVersion)
    );
}

#[test]
fn known_revision_without_converter_is_refused() {
    // PlainMetrics remembers revision 0 but ships no converter.
    let value = PlainMetrics { count: 1, total: 2 };
    assert_eq!(
        encode_message(&value, CommonFlags::NONE, DataFlags::NONE, Some(0)),
        Err(Status::ErrorNotSupportedInterfaceVersion)
    );
}

#[test]
fn legacy_message_carries_negotiated_version_and_difference_bit() {
    let value = PackedCounters { x: 1, y: 2, z: 3 };
    let bytes = encode_message(&value, CommonFlags::NONE, DataFlags::NONE, Some(1)).unwrap();

    // Data sub-header: id at 4, flags at 20, interface version at 22.
    let flag_bits = u16::from_le_bytes([bytes[20], bytes[21]]);
    assert_ne!(
        flag_bits & DataFlags::INTERFACE_VERSIONS_DIFFER.bits(),
        0,
        "difference bit must travel"
    );
    let version = u32::from_le_bytes([bytes[22], bytes[23], bytes[24], bytes[25]]);
    assert_eq!(version, 1);
}

#[test]
fn echo_request_converts_both_ways() {
    let value = EchoRequest {
        text: "compat".to_string(),
        seq: 77,
    };
    let bytes = encode_message(&value, CommonFlags::NONE, DataFlags::NONE, Some(1)).unwrap();
    let decoded: EchoRequest = decode_message(bytes.data()).unwrap();
    assert_eq!(decoded.text, "compat");
    // Revision 1 did not carry a sequence number.
    assert_eq!(decoded.seq, 0);
}

#[test]
fn current_version_needs_no_conversion() {
    let value = PackedCounters { x: 4, y: 5, z: 6 };
    let explicit = encode_message(&value, CommonFlags::NONE, DataFlags::NONE, Some(3)).unwrap();
    let implicit = encode_message(&value, CommonFlags::NONE, DataFlags::NONE, None).unwrap();
    assert_eq!(explicit.data(), implicit.data());

    let decoded: PackedCounters = decode_message(explicit.data()).unwrap();
    assert_eq!(decoded, value);
}
