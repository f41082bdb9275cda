#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use xcodec::{CacheCapacity, CacheEpoch, ChunkCache, CodecError, Decoder, StreamState};

fuzz_target!(|data: Vec<u8>| {
    // Arbitrary wire bytes must never panic, only fail cleanly
    let cache = ChunkCache::memory(CacheCapacity::entries(64), CacheEpoch::generate());
    let mut decoder = Decoder::new(cache);
    let mut plain = BytesMut::new();

    // Feed in uneven slices so partial headers are exercised
    let mut rest = &data[..];
    let mut step = 1;
    while !rest.is_empty() {
        let (piece, tail) = rest.split_at(step.min(rest.len()));
        if decoder.decode(piece, &mut plain).is_err() {
            assert_eq!(decoder.state(), StreamState::Failed);
            assert!(matches!(
                decoder.decode(b"", &mut plain),
                Err(CodecError::Terminated)
            ));
            return;
        }
        rest = tail;
        step = step % 13 + 1;
    }

    let _ = decoder.finish();
});
