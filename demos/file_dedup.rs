//! Encode a file twice through a disk-backed cache and report the savings.
//!
//! Run with:
//!     cargo run --example file_dedup -- /path/to/file

use std::env;
use std::fs::File;
use std::io::Read;

use bytes::BytesMut;
use xcodec::{CacheCapacity, CacheEpoch, ChunkCache, ChunkConfig, Decoder, Encoder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "Cargo.toml".to_string());

    println!("Encoding file: {}\n", path);

    let cache_root = env::temp_dir().join("xcodec-demo");
    let epoch = CacheEpoch::generate();
    let capacity = CacheCapacity::bytes(256 << 20);

    // Custom config for larger chunks
    let config = ChunkConfig::new(
        2 * 1024,  // min: 2 KiB
        8 * 1024,  // avg: 8 KiB
        32 * 1024, // max: 32 KiB
    )?;

    let mut encoder = Encoder::new(config, ChunkCache::disk(cache_root.join("send"), capacity, epoch)?)?;
    let mut decoder = Decoder::new(ChunkCache::disk(cache_root.join("recv"), capacity, epoch)?);

    for pass in 1..=2 {
        let mut file = File::open(&path)?;
        let mut buf = vec![0u8; 64 * 1024];
        let mut raw = 0usize;
        let mut coded = 0usize;
        let mut plain = BytesMut::new();

        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            raw += n;

            let mut wire = BytesMut::new();
            encoder.encode(&buf[..n], &mut wire)?;
            coded += wire.len();
            decoder.decode(&wire, &mut plain)?;
        }

        let mut wire = BytesMut::new();
        encoder.flush(&mut wire);
        coded += wire.len();
        decoder.decode(&wire, &mut plain)?;
        decoder.finish()?;
        assert_eq!(plain.len(), raw);

        println!("Pass {}: {:>10} raw bytes -> {:>10} coded bytes", pass, raw, coded);

        encoder.reset();
        decoder.reset();
    }

    let counts = encoder.counts();
    println!(
        "\nFrames: {} escapes, {} declares, {} references",
        counts.escapes, counts.declarations, counts.references
    );
    println!("Cache: {} chunks, {} bytes", encoder.cache().len(), encoder.cache().bytes_used());

    Ok(())
}
