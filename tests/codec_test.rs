// Integration tests for the encoder/decoder pair
// Tests cover: round-trip, cache lockstep, framing, error paths, handshake

use bytes::{Bytes, BytesMut};
use proptest::prelude::*;
use xcodec::{
    Blake3Hasher, CacheCapacity, CacheConfig, CacheEpoch, ChunkCache, ChunkConfig, Codec,
    CodecConfig, CodecError, Decoder, Encoder, Frame, Hello, ProtocolError, StreamState,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn pair(config: ChunkConfig, capacity: CacheCapacity) -> (Encoder, Decoder) {
    let epoch = CacheEpoch::generate();
    let encoder = Encoder::new(config, ChunkCache::memory(capacity, epoch)).unwrap();
    let decoder = Decoder::new(ChunkCache::memory(capacity, epoch));
    (encoder, decoder)
}

fn encode_all(encoder: &mut Encoder, input: &[u8]) -> BytesMut {
    let mut wire = BytesMut::new();
    encoder.encode(input, &mut wire).unwrap();
    encoder.flush(&mut wire);
    wire
}

fn decode_all(decoder: &mut Decoder, wire: &[u8]) -> BytesMut {
    let mut plain = BytesMut::new();
    decoder.decode(wire, &mut plain).unwrap();
    decoder.finish().unwrap();
    plain
}

fn frames(wire: &[u8]) -> Vec<Frame> {
    let mut buf = BytesMut::from(wire);
    let mut out = Vec::new();
    while let Some(frame) = Frame::decode(&mut buf).unwrap() {
        out.push(frame);
    }
    assert!(buf.is_empty(), "trailing bytes after last frame");
    out
}

/// Deterministic pseudo-random bytes (xorshift).
fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as u8
        })
        .collect()
}

fn fixed4() -> ChunkConfig {
    ChunkConfig::new(4, 4, 4).unwrap()
}

/// Exchanges hellos so both codecs accept each other.
fn connect(a: &mut Codec, b: &mut Codec) {
    let (hello_a, hello_b) = (a.hello(), b.hello());
    a.accept(&hello_b).unwrap();
    b.accept(&hello_a).unwrap();
}

// ============================================================================
// Round-trip
// ============================================================================

#[test]
fn test_roundtrip_random_data() {
    init_tracing();
    let (mut enc, mut dec) = pair(ChunkConfig::new(64, 256, 1024).unwrap(), CacheCapacity::entries(4096));
    let data = noise(200_000, 7);

    let wire = encode_all(&mut enc, &data);
    let plain = decode_all(&mut dec, &wire);

    assert_eq!(&plain[..], &data[..]);
}

#[test]
fn test_roundtrip_repeated_content_shrinks() {
    let (mut enc, mut dec) = pair(ChunkConfig::new(64, 256, 1024).unwrap(), CacheCapacity::entries(4096));
    let block = noise(50_000, 11);
    let data = [block.clone(), block.clone(), block].concat();

    let wire = encode_all(&mut enc, &data);
    let plain = decode_all(&mut dec, &wire);

    assert_eq!(&plain[..], &data[..]);
    assert!(
        wire.len() < data.len() * 2 / 3,
        "two repeats should mostly become references: {} coded vs {} raw",
        wire.len(),
        data.len()
    );
    assert!(enc.counts().references > 0);
    assert_eq!(enc.counts(), dec.counts());
}

#[test]
fn test_roundtrip_across_streams_keeps_cache() {
    let (mut enc, mut dec) = pair(ChunkConfig::new(32, 128, 512).unwrap(), CacheCapacity::entries(1024));
    let data = noise(20_000, 3);

    let first = encode_all(&mut enc, &data);
    assert_eq!(&decode_all(&mut dec, &first)[..], &data[..]);

    enc.reset();
    dec.reset();

    let second = encode_all(&mut enc, &data);
    assert!(second.len() < first.len());
    assert_eq!(&decode_all(&mut dec, &second)[..], &data[..]);
}

// ============================================================================
// Concrete scenario
// ============================================================================

#[test]
fn test_concrete_eviction_scenario() {
    let (mut enc, mut dec) = pair(fixed4(), CacheCapacity::entries(2));
    let input = b"AAAABBBBAAAACCCCAAAA";

    let wire = encode_all(&mut enc, input);

    let h_a = Blake3Hasher::hash(b"AAAA");
    let h_b = Blake3Hasher::hash(b"BBBB");
    let h_c = Blake3Hasher::hash(b"CCCC");
    assert_eq!(
        frames(&wire),
        vec![
            Frame::Declare {
                hash: h_a,
                data: Bytes::from_static(b"AAAA")
            },
            Frame::Declare {
                hash: h_b,
                data: Bytes::from_static(b"BBBB")
            },
            Frame::Reference(h_a),
            Frame::Declare {
                hash: h_c,
                data: Bytes::from_static(b"CCCC")
            },
            Frame::Declare {
                hash: h_a,
                data: Bytes::from_static(b"AAAA")
            },
        ]
    );

    assert_eq!(&decode_all(&mut dec, &wire)[..], input);
    assert!(enc.cache().hashes().eq(dec.cache().hashes()));
}

// ============================================================================
// Cache Behavior Tests
// ============================================================================

#[test]
fn test_single_declaration_while_resident() {
    let (mut enc, _) = pair(fixed4(), CacheCapacity::entries(8));
    let input = b"WXYZ".repeat(50);

    let wire = encode_all(&mut enc, &input);
    let frames = frames(&wire);

    let declares = frames
        .iter()
        .filter(|f| matches!(f, Frame::Declare { .. }))
        .count();
    assert_eq!(declares, 1);
    assert_eq!(frames.len(), 50);
}

#[test]
fn test_evicted_chunk_is_redeclared() {
    let (mut enc, mut dec) = pair(fixed4(), CacheCapacity::entries(1));
    let input = b"AAAABBBBAAAA";

    let wire = encode_all(&mut enc, input);

    assert!(
        frames(&wire)
            .iter()
            .all(|f| matches!(f, Frame::Declare { .. })),
        "with one slot nothing can be referenced"
    );
    assert_eq!(&decode_all(&mut dec, &wire)[..], input);
}

#[test]
fn test_capacity_fallback_roundtrips() {
    let (mut enc, mut dec) = pair(ChunkConfig::new(64, 128, 256).unwrap(), CacheCapacity::bytes(32));
    let data = noise(4096, 5);

    let wire = encode_all(&mut enc, &data);

    assert!(frames(&wire).iter().all(|f| matches!(f, Frame::Escape(_))));
    assert_eq!(enc.counts().declarations, 0);
    assert_eq!(&decode_all(&mut dec, &wire)[..], &data[..]);
    assert!(dec.cache().is_empty());
}

#[test]
fn test_byte_budget_lockstep() {
    let capacity = CacheCapacity::bytes(4096).with_max_entries(64);
    let (mut enc, mut dec) = pair(ChunkConfig::new(32, 128, 512).unwrap(), capacity);
    let block = noise(6000, 21);
    let data = [block.clone(), noise(9000, 22), block].concat();

    let wire = encode_all(&mut enc, &data);

    assert_eq!(&decode_all(&mut dec, &wire)[..], &data[..]);
    assert!(enc.cache().bytes_used() <= 4096);
    assert_eq!(enc.cache().bytes_used(), dec.cache().bytes_used());
    assert!(enc.cache().hashes().eq(dec.cache().hashes()));
}

// ============================================================================
// Disk Cache Tests
// ============================================================================

#[test]
fn test_disk_encoder_memory_decoder() {
    let root = tempfile::tempdir().unwrap();
    let epoch = CacheEpoch::generate();
    let capacity = CacheCapacity::entries(16);
    let config = ChunkConfig::new(16, 64, 256).unwrap();

    let mut enc = Encoder::new(config, ChunkCache::disk(root.path(), capacity, epoch).unwrap()).unwrap();
    let mut dec = Decoder::new(ChunkCache::memory(capacity, epoch));

    let block = noise(3000, 9);
    let data = [block.clone(), block].concat();
    let wire = encode_all(&mut enc, &data);

    assert_eq!(&decode_all(&mut dec, &wire)[..], &data[..]);
    assert!(enc.cache().hashes().eq(dec.cache().hashes()));
}

#[test]
fn test_disk_codec_pair() {
    let root = tempfile::tempdir().unwrap();
    let epoch = CacheEpoch::generate();
    let config = CodecConfig::new(
        ChunkConfig::new(16, 64, 256).unwrap(),
        CacheConfig::disk(root.path().join("a"), epoch).with_capacity(CacheCapacity::entries(32)),
    )
    .unwrap();
    let peer_config = config
        .clone()
        .with_cache_config(CacheConfig::disk(root.path().join("b"), epoch).with_capacity(CacheCapacity::entries(32)));

    let mut a = Codec::new(config).unwrap();
    let mut b = Codec::new(peer_config).unwrap();
    connect(&mut a, &mut b);

    let data = [noise(2000, 1), noise(2000, 1), noise(500, 2)].concat();
    let mut wire = BytesMut::new();
    a.encode(&data, &mut wire).unwrap();
    a.flush(&mut wire);

    let mut plain = BytesMut::new();
    b.decode(&wire, &mut plain).unwrap();
    b.finish().unwrap();
    assert_eq!(&plain[..], &data[..]);
}

#[test]
fn test_disk_codecs_built_from_one_config_stay_independent() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let epoch = CacheEpoch::generate();
    let config = CodecConfig::new(
        fixed4(),
        CacheConfig::disk(root.path(), epoch).with_capacity(CacheCapacity::entries(8)),
    )
    .unwrap();

    let mut tx = Codec::new(config.clone()).unwrap();
    let mut rx = Codec::new(config.clone()).unwrap();
    connect(&mut tx, &mut rx);

    let mut wire = BytesMut::new();
    let mut plain = BytesMut::new();
    tx.encode(b"AAAA", &mut wire).unwrap();
    rx.decode(&wire, &mut plain).unwrap();

    // A later connection on the same root must not disturb the first one.
    let mut late = Codec::new(config.clone()).unwrap();
    let mut late_peer = Codec::new(config).unwrap();
    connect(&mut late, &mut late_peer);
    assert_ne!(
        late.decoder().cache().directory(),
        rx.decoder().cache().directory()
    );

    wire.clear();
    tx.encode(b"AAAA", &mut wire).unwrap();
    assert_eq!(frames(&wire), vec![Frame::Reference(Blake3Hasher::hash(b"AAAA"))]);
    rx.decode(&wire, &mut plain).unwrap();
    rx.finish().unwrap();
    assert_eq!(&plain[..], b"AAAAAAAA");
}

// ============================================================================
// Edge Cases
// ============================================================================

#[test]
fn test_empty_input() {
    let (mut enc, mut dec) = pair(fixed4(), CacheCapacity::entries(2));
    let mut wire = BytesMut::new();

    enc.encode(&[], &mut wire).unwrap();
    assert!(!enc.flush(&mut wire));
    assert!(wire.is_empty());

    assert!(decode_all(&mut dec, &wire).is_empty());
}

#[test]
fn test_input_shorter_than_min_is_one_escape() {
    let (mut enc, mut dec) = pair(ChunkConfig::new(64, 64, 64).unwrap(), CacheCapacity::entries(2));

    let wire = encode_all(&mut enc, b"short tail");

    assert_eq!(frames(&wire), vec![Frame::Escape(Bytes::from_static(b"short tail"))]);
    assert_eq!(&decode_all(&mut dec, &wire)[..], b"short tail");
}

#[test]
fn test_max_size_forces_boundary() {
    let (mut enc, _) = pair(ChunkConfig::new(8, 1 << 20, 1 << 20).unwrap(), CacheCapacity::entries(64));
    let data = noise((1 << 20) + 100, 13);

    let wire = encode_all(&mut enc, &data);
    let frames = frames(&wire);

    // Either a content boundary or the forced one cut before the tail.
    assert!(frames.len() >= 2);
    for frame in &frames {
        if let Frame::Declare { data, .. } = frame {
            assert!(data.len() <= 1 << 20);
        }
    }
}

#[test]
fn test_fragmented_encode_matches_single_call() {
    let (mut whole, _) = pair(ChunkConfig::new(16, 64, 256).unwrap(), CacheCapacity::entries(1024));
    let (mut split, _) = pair(ChunkConfig::new(16, 64, 256).unwrap(), CacheCapacity::entries(1024));
    let data = [noise(5000, 4), noise(5000, 4)].concat();

    let expected = encode_all(&mut whole, &data);

    let mut wire = BytesMut::new();
    for piece in data.chunks(7) {
        split.encode(piece, &mut wire).unwrap();
    }
    split.flush(&mut wire);

    assert_eq!(wire, expected);
}

#[test]
fn test_fragmented_decode_matches_single_call() {
    let (mut enc, mut dec) = pair(ChunkConfig::new(16, 64, 256).unwrap(), CacheCapacity::entries(1024));
    let data = [noise(3000, 8), noise(3000, 8)].concat();
    let wire = encode_all(&mut enc, &data);

    let mut plain = BytesMut::new();
    for piece in wire.chunks(3) {
        dec.decode(piece, &mut plain).unwrap();
    }
    dec.finish().unwrap();

    assert_eq!(&plain[..], &data[..]);
}

// ============================================================================
// Error Path Tests
// ============================================================================

#[test]
fn test_reference_to_unknown_hash_is_desync() {
    init_tracing();
    let (_, mut dec) = pair(fixed4(), CacheCapacity::entries(2));
    let mut wire = BytesMut::new();
    Frame::Reference(Blake3Hasher::hash(b"never declared")).encode(&mut wire);

    let mut plain = BytesMut::new();
    let err = dec.decode(&wire, &mut plain).unwrap_err();

    assert!(matches!(err, CodecError::CacheDesync { .. }));
    assert!(err.is_fatal());
    assert_eq!(dec.state(), StreamState::Failed);
    assert!(matches!(dec.finish(), Err(CodecError::Terminated)));
}

#[test]
fn test_mismatched_policies_desync() {
    // Decoder cache smaller than the encoder's: a reference the encoder
    // considers resident has already left the decoder.
    let epoch = CacheEpoch::generate();
    let mut enc = Encoder::new(fixed4(), ChunkCache::memory(CacheCapacity::entries(4), epoch)).unwrap();
    let mut dec = Decoder::new(ChunkCache::memory(CacheCapacity::entries(1), epoch));

    let wire = encode_all(&mut enc, b"AAAABBBBAAAA");

    let mut plain = BytesMut::new();
    assert!(matches!(
        dec.decode(&wire, &mut plain),
        Err(CodecError::CacheDesync { .. })
    ));
}

#[test]
fn test_corrupted_declare_is_rejected() {
    let (mut enc, mut dec) = pair(fixed4(), CacheCapacity::entries(2));
    let mut wire = encode_all(&mut enc, b"DATA");

    let last = wire.len() - 1;
    wire[last] ^= 0xFF;

    let mut plain = BytesMut::new();
    let err = dec.decode(&wire, &mut plain).unwrap_err();
    assert!(matches!(
        err,
        CodecError::Protocol(ProtocolError::HashMismatch { .. })
    ));
}

#[test]
fn test_malformed_frames_are_fatal() {
    let cases: Vec<(&str, Vec<u8>)> = vec![
        ("unknown opcode", vec![0x09, 0, 0, 0, 1, 0]),
        ("empty escape", vec![0x01, 0, 0, 0, 0]),
        ("oversized escape", vec![0x01, 0x01, 0, 0, 1]),
        ("declare without content", {
            let mut v = vec![0x02, 0, 0, 0, 32];
            v.extend_from_slice(&[0u8; 32]);
            v
        }),
        ("short reference", vec![0x03, 0, 0, 0, 31]),
    ];

    for (name, bytes) in cases {
        let (_, mut dec) = pair(fixed4(), CacheCapacity::entries(2));
        let mut plain = BytesMut::new();

        let err = dec.decode(&bytes, &mut plain).unwrap_err();

        assert!(matches!(err, CodecError::Protocol(_)), "{name}: {err}");
        assert_eq!(dec.state(), StreamState::Failed, "{name}");
        assert!(
            matches!(dec.decode(b"", &mut plain), Err(CodecError::Terminated)),
            "{name}"
        );
    }
}

#[test]
fn test_truncated_stream() {
    let (mut enc, mut dec) = pair(fixed4(), CacheCapacity::entries(2));
    let wire = encode_all(&mut enc, b"AAAABBBB");

    let mut plain = BytesMut::new();
    dec.decode(&wire[..wire.len() - 1], &mut plain).unwrap();

    assert!(matches!(
        dec.finish(),
        Err(CodecError::Protocol(ProtocolError::TruncatedFrame { .. }))
    ));
}

#[test]
fn test_encode_after_flush() {
    let (mut enc, _) = pair(fixed4(), CacheCapacity::entries(2));
    let mut wire = BytesMut::new();
    enc.flush(&mut wire);

    assert!(matches!(
        enc.encode(b"late", &mut wire),
        Err(CodecError::Terminated)
    ));
}

// ============================================================================
// Handshake Tests
// ============================================================================

#[test]
fn test_handshake_over_the_wire() {
    let epoch = CacheEpoch::generate();
    let config = CodecConfig::new(ChunkConfig::default(), CacheConfig::memory(epoch)).unwrap();
    let client = Codec::new(config.clone()).unwrap();
    let mut server = Codec::new(config).unwrap();

    let mut wire = BytesMut::new();
    client.hello().encode(&mut wire);
    let hello = Hello::decode(&mut wire).unwrap().unwrap();

    assert!(!server.is_accepted());
    server.accept(&hello).unwrap();
    assert!(server.is_accepted());
    assert!(wire.is_empty());
}

#[test]
fn test_codec_refuses_traffic_before_handshake() {
    let epoch = CacheEpoch::generate();
    let config = CodecConfig::new(fixed4(), CacheConfig::memory(epoch)).unwrap();
    let mut client = Codec::new(config.clone()).unwrap();
    let mut server = Codec::new(config).unwrap();

    let mut wire = BytesMut::new();
    assert!(matches!(
        client.encode(b"AAAA", &mut wire),
        Err(CodecError::HandshakeRequired)
    ));
    assert!(wire.is_empty());
    assert_eq!(client.encoder().cache().len(), 0);

    connect(&mut client, &mut server);
    client.encode(b"AAAA", &mut wire).unwrap();

    let mut plain = BytesMut::new();
    server.decode(&wire, &mut plain).unwrap();
    assert_eq!(&plain[..], b"AAAA");
}

#[test]
fn test_handshake_rejects_foreign_epoch() {
    let ours = CodecConfig::new(ChunkConfig::default(), CacheConfig::memory(CacheEpoch::generate())).unwrap();
    let theirs = CodecConfig::new(ChunkConfig::default(), CacheConfig::memory(CacheEpoch::generate())).unwrap();

    let mut server = Codec::new(ours).unwrap();
    let client = Codec::new(theirs).unwrap();

    assert!(matches!(
        server.accept(&client.hello()),
        Err(CodecError::EpochMismatch { .. })
    ));
    let mut plain = BytesMut::new();
    assert!(matches!(
        server.decode(b"anything", &mut plain),
        Err(CodecError::HandshakeRequired)
    ));
}

#[test]
fn test_config_errors_before_any_bytes() {
    let config = CodecConfig::default().with_chunk_config(ChunkConfig::default().with_avg_size(3000));
    assert!(matches!(
        Codec::new(config),
        Err(CodecError::InvalidConfig { .. })
    ));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_roundtrip(data in prop::collection::vec(any::<u8>(), 0..4096), entries in 1usize..16) {
        let (mut enc, mut dec) = pair(ChunkConfig::new(8, 32, 128).unwrap(), CacheCapacity::entries(entries));
        let wire = encode_all(&mut enc, &data);
        let plain = decode_all(&mut dec, &wire);
        prop_assert_eq!(&plain[..], &data[..]);
    }

    #[test]
    fn prop_roundtrip_low_entropy(
        data in prop::collection::vec(0u8..3, 0..4096),
        entries in 1usize..8,
    ) {
        let (mut enc, mut dec) = pair(ChunkConfig::new(4, 8, 32).unwrap(), CacheCapacity::entries(entries));
        let wire = encode_all(&mut enc, &data);
        let plain = decode_all(&mut dec, &wire);
        prop_assert_eq!(&plain[..], &data[..]);
        prop_assert!(enc.cache().hashes().eq(dec.cache().hashes()));
    }

    #[test]
    fn prop_fragmentation_transparent(
        data in prop::collection::vec(any::<u8>(), 1..4096),
        cuts in prop::collection::vec(1usize..300, 1..32),
    ) {
        let config = ChunkConfig::new(8, 32, 128).unwrap();
        let (mut whole, _) = pair(config, CacheCapacity::entries(64));
        let (mut split, mut dec) = pair(config, CacheCapacity::entries(64));

        let expected = encode_all(&mut whole, &data);

        let mut wire = BytesMut::new();
        let mut rest = &data[..];
        for cut in cuts.iter().cycle() {
            if rest.is_empty() {
                break;
            }
            let (piece, tail) = rest.split_at((*cut).min(rest.len()));
            split.encode(piece, &mut wire).unwrap();
            rest = tail;
        }
        split.flush(&mut wire);

        prop_assert_eq!(&wire[..], &expected[..]);

        // The same cuts applied to the coded stream.
        let mut plain = BytesMut::new();
        let mut rest = &wire[..];
        for cut in cuts.iter().cycle() {
            if rest.is_empty() {
                break;
            }
            let (piece, tail) = rest.split_at((*cut).min(rest.len()));
            dec.decode(piece, &mut plain).unwrap();
            rest = tail;
        }
        dec.finish().unwrap();
        prop_assert_eq!(&plain[..], &data[..]);
    }

    #[test]
    fn prop_single_declaration(chunk in prop::collection::vec(any::<u8>(), 4), repeats in 1usize..64) {
        let (mut enc, _) = pair(fixed4(), CacheCapacity::entries(4));
        let input = chunk.repeat(repeats);
        let wire = encode_all(&mut enc, &input);
        prop_assert_eq!(enc.counts().declarations, 1);
        prop_assert_eq!(enc.counts().references, repeats as u64 - 1);
        prop_assert_eq!(frames(&wire).len(), repeats);
    }
}
