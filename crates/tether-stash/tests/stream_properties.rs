//! Stream-level properties of stashable records: round-trips, offsets,
//! size bounds, tag handling and segment framing.

use proptest::prelude::*;
use tether_stash::codec::SEGMENT_HEADER_SIZE;
use tether_stash::{
    MarkerStash, SpringForceSpec, StashError, StashReader, StashWriter, Stashable, StashableId,
    StashableRegistry, TargetPointForceSpec,
};
use tether_test_utils::{mixed_payloads, registered_registry, spring_chain, spring_ring, FailingWriter};

// ── Strategies ──────────────────────────────────────────────────

fn arb_spring() -> impl Strategy<Value = SpringForceSpec> {
    (-1i32..5_000, 0usize..20).prop_flat_map(|(master, n)| {
        (
            Just(master),
            prop::collection::vec(0i32..5_000, n),
            prop::collection::vec(0i32..4, n),
            prop::collection::vec(0.0f64..1e6, n),
            prop::collection::vec(0.0f64..10.0, n),
        )
            .prop_map(|(m, s, l, k, r)| SpringForceSpec::new(m, s, l, k, r).unwrap())
    })
}

fn arb_target() -> impl Strategy<Value = TargetPointForceSpec> {
    (0i32..5_000, 0.0f64..1e6, prop::array::uniform3(-10.0f64..10.0))
        .prop_map(|(m, k, x)| TargetPointForceSpec::new(m, k, x))
}

fn arb_payload() -> impl Strategy<Value = Stashable> {
    prop_oneof![
        arb_spring().prop_map(Stashable::from),
        arb_target().prop_map(Stashable::from),
    ]
}

// ── Record properties ───────────────────────────────────────────

proptest! {
    #[test]
    fn unpack_returns_what_pack_wrote(payload in arb_payload()) {
        let registry = registered_registry();
        let mut buf = Vec::new();
        registry.pack(&mut buf, &payload).unwrap();

        let mut cursor = buf.as_slice();
        let got = registry.unpack(&mut cursor, 0).unwrap();
        prop_assert!(cursor.is_empty(), "{} bytes left unread", cursor.len());
        prop_assert_eq!(got, payload);
    }

    #[test]
    fn packed_size_never_underestimates(payload in arb_payload()) {
        let registry = registered_registry();
        let mut buf = Vec::new();
        registry.pack(&mut buf, &payload).unwrap();
        prop_assert!(buf.len() <= registry.packed_size_upper_bound(&payload));
    }

    #[test]
    fn unpacked_sequences_share_one_length(spec in arb_spring(), offset in -100i32..100) {
        let registry = registered_registry();
        let mut buf = Vec::new();
        registry.pack(&mut buf, &spec.clone().into()).unwrap();
        let got = registry.unpack(&mut buf.as_slice(), offset).unwrap();
        let got = got.as_spring_force().unwrap();
        let n = got.spring_count();
        prop_assert_eq!(n, spec.spring_count());
        prop_assert_eq!(got.slave_indices().len(), n);
        prop_assert_eq!(got.force_law_indices().len(), n);
        prop_assert_eq!(got.stiffnesses().len(), n);
        prop_assert_eq!(got.rest_lengths().len(), n);
    }

    #[test]
    fn offset_shifts_indices_and_nothing_else(spec in arb_spring(), offset in -1_000i32..1_000) {
        let registry = registered_registry();
        let mut buf = Vec::new();
        registry.pack(&mut buf, &spec.clone().into()).unwrap();
        let got = registry.unpack(&mut buf.as_slice(), offset).unwrap();
        let got = got.as_spring_force().unwrap();

        prop_assert_eq!(got.master_index(), spec.master_index() + offset);
        for (g, s) in got.slave_indices().iter().zip(spec.slave_indices()) {
            prop_assert_eq!(*g, *s + offset);
        }
        prop_assert_eq!(got.force_law_indices(), spec.force_law_indices());
        prop_assert_eq!(got.stiffnesses(), spec.stiffnesses());
        prop_assert_eq!(got.rest_lengths(), spec.rest_lengths());
    }

    #[test]
    fn interleaved_records_read_back_in_append_order(
        payloads in prop::collection::vec(arb_payload(), 0..12),
    ) {
        let registry = registered_registry();
        let mut buf = Vec::new();
        for payload in &payloads {
            registry.pack(&mut buf, payload).unwrap();
        }
        let mut cursor = buf.as_slice();
        for payload in &payloads {
            prop_assert_eq!(&registry.unpack(&mut cursor, 0).unwrap(), payload);
        }
        prop_assert!(cursor.is_empty());
    }
}

// ── Worked example ──────────────────────────────────────────────

#[test]
fn worked_example_moves_by_one_hundred() {
    let registry = registered_registry();
    let spec =
        SpringForceSpec::new(5, vec![7, 9], vec![0, 1], vec![2.0, 3.5], vec![1.0, 1.2]).unwrap();
    let mut buf = Vec::new();
    registry.pack(&mut buf, &spec.into()).unwrap();
    assert_eq!(buf.len(), 4 + 8 + 2 * 24);

    let got = registry.unpack(&mut buf.as_slice(), 100).unwrap();
    let got = got.as_spring_force().unwrap();
    assert_eq!(got.master_index(), 105);
    assert_eq!(got.slave_indices(), &[107, 109]);
    assert_eq!(got.force_law_indices(), &[0, 1]);
    assert_eq!(got.stiffnesses(), &[2.0, 3.5]);
    assert_eq!(got.rest_lengths(), &[1.0, 1.2]);
}

#[test]
fn empty_record_roundtrips_with_invalid_master() {
    let registry = registered_registry();
    let mut buf = Vec::new();
    registry
        .pack(&mut buf, &SpringForceSpec::default().into())
        .unwrap();
    let got = registry.unpack(&mut buf.as_slice(), 0).unwrap();
    assert_eq!(got, Stashable::from(SpringForceSpec::default()));
}

// ── Registration and tags ───────────────────────────────────────

#[test]
fn identical_registration_sequences_agree() {
    let a = registered_registry();
    let b = registered_registry();
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(
        a.iter().collect::<Vec<_>>(),
        b.iter().collect::<Vec<_>>()
    );
}

#[test]
fn reordered_registration_changes_fingerprint() {
    let mut reordered = StashableRegistry::new();
    reordered.register::<TargetPointForceSpec>();
    reordered.register::<SpringForceSpec>();
    assert_ne!(reordered.fingerprint(), registered_registry().fingerprint());
}

#[test]
fn registering_twice_returns_the_same_tag() {
    let mut registry = StashableRegistry::new();
    let first = registry.register::<SpringForceSpec>();
    assert_eq!(registry.register::<SpringForceSpec>(), first);
    assert_eq!(registry.len(), 1);
    assert!(registry.is_registered::<SpringForceSpec>());
    assert!(!registry.is_registered::<TargetPointForceSpec>());
}

#[test]
fn unknown_tag_stops_right_after_the_tag() {
    let mut writer_side = StashableRegistry::new();
    writer_side.register::<SpringForceSpec>();
    writer_side.register::<TargetPointForceSpec>();
    let mut buf = Vec::new();
    writer_side
        .pack(&mut buf, &TargetPointForceSpec::new(1, 1.0, [0.0; 3]).into())
        .unwrap();

    let mut reader_side = StashableRegistry::new();
    reader_side.register::<SpringForceSpec>();
    let mut cursor = buf.as_slice();
    let err = reader_side.unpack(&mut cursor, 0).unwrap_err();
    assert!(matches!(
        err,
        StashError::UnknownTag {
            tag: StashableId(1)
        }
    ));
    assert_eq!(cursor.len(), buf.len() - 4);
}

// ── Segments ────────────────────────────────────────────────────

#[test]
fn network_fixtures_travel_through_a_segment() {
    let registry = registered_registry();
    let records: Vec<SpringForceSpec> = spring_chain(6).into_iter().chain(spring_ring(4)).collect();

    let mut writer = StashWriter::new(Vec::new(), &registry, 0).unwrap();
    for (i, spec) in records.iter().enumerate() {
        writer
            .write_entry(i as i32, &spec.clone().into())
            .unwrap();
    }
    let buf = writer.into_inner();

    let reader = StashReader::open(buf.as_slice(), &registry).unwrap();
    let got: Vec<_> = reader.entries(0).collect::<Result<_, _>>().unwrap();
    assert_eq!(got.len(), records.len());
    for ((marker, payload), (i, spec)) in got.iter().zip(records.iter().enumerate()) {
        assert_eq!(*marker, i as i32);
        assert_eq!(payload.as_spring_force(), Some(spec));
    }
}

#[test]
fn header_only_segment_has_no_entries() {
    let registry = registered_registry();
    let buf = StashWriter::new(Vec::new(), &registry, 3)
        .unwrap()
        .into_inner();
    assert_eq!(buf.len(), SEGMENT_HEADER_SIZE);
    let mut reader = StashReader::open(buf.as_slice(), &registry).unwrap();
    assert_eq!(reader.source_rank(), 3);
    assert!(reader.next_entry(0).unwrap().is_none());
    assert_eq!(reader.entries_read(), 0);
}

#[test]
fn corrupted_magic_and_version_rejected() {
    let registry = registered_registry();
    let good = StashWriter::new(Vec::new(), &registry, 0)
        .unwrap()
        .into_inner();

    let mut bad_magic = good.clone();
    bad_magic[0] = b'X';
    assert!(matches!(
        StashReader::open(bad_magic.as_slice(), &registry),
        Err(StashError::InvalidMagic)
    ));

    let mut bad_version = good;
    bad_version[4] = 7;
    assert!(matches!(
        StashReader::open(bad_version.as_slice(), &registry),
        Err(StashError::UnsupportedVersion { found: 7 })
    ));
}

#[test]
fn failed_write_keeps_payloads_attached() {
    let registry = registered_registry();
    let mut stash = MarkerStash::new();
    for payload in mixed_payloads(4) {
        stash.attach(payload.master_index(), payload);
    }
    let before = stash.clone();

    let mut writer = StashWriter::new(FailingWriter::new(SEGMENT_HEADER_SIZE + 10), &registry, 0)
        .unwrap();
    let err = stash.pack_departing(&mut writer, |_, _| true).unwrap_err();
    assert!(matches!(err, StashError::Io(_)));
    assert_eq!(stash, before);
}
