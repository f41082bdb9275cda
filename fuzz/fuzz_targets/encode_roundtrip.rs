#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use xcodec::{CacheCapacity, CacheEpoch, ChunkCache, ChunkConfig, Decoder, Encoder};

fuzz_target!(|data: Vec<u8>| {
    // Test with various chunk configurations and cache sizes
    let setups = vec![
        (ChunkConfig::new(4, 4, 4).unwrap(), CacheCapacity::entries(2)),
        (ChunkConfig::new(4, 16, 64).unwrap(), CacheCapacity::entries(8)),
        (ChunkConfig::new(64, 256, 1024).unwrap(), CacheCapacity::bytes(2048)),
        (ChunkConfig::default(), CacheCapacity::default()),
    ];

    for (config, capacity) in setups {
        let epoch = CacheEpoch::generate();
        let mut encoder = Encoder::new(config, ChunkCache::memory(capacity, epoch)).unwrap();
        let mut decoder = Decoder::new(ChunkCache::memory(capacity, epoch));

        // Encode in two uneven halves
        let mut wire = BytesMut::new();
        let (head, tail) = data.split_at(data.len() / 3);
        encoder.encode(head, &mut wire).unwrap();
        encoder.encode(tail, &mut wire).unwrap();
        encoder.flush(&mut wire);

        // Verify: round-trip is exact
        let mut plain = BytesMut::new();
        decoder.decode(&wire, &mut plain).unwrap();
        decoder.finish().unwrap();
        assert_eq!(&plain[..], &data[..]);

        // Verify: both caches hold the same entries in the same order
        assert!(encoder.cache().hashes().eq(decoder.cache().hashes()));
    }
});
