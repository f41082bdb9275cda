//! Two codec endpoints exchanging a repetitive stream.
//!
//! Run with:
//!     cargo run --example roundtrip

use bytes::BytesMut;
use xcodec::{CacheConfig, CacheEpoch, ChunkConfig, Codec, CodecConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Both proxies are configured with the same epoch
    let epoch = CacheEpoch::generate();
    let config = CodecConfig::new(ChunkConfig::default(), CacheConfig::memory(epoch))?.with_counting(true);

    let mut client = Codec::new(config.clone())?;
    let mut server = Codec::new(config)?;

    // Handshake
    server.accept(&client.hello())?;
    client.accept(&server.hello())?;

    // A "page" fetched three times, with a small change each time
    let page: Vec<u8> = (0..200_000u32).map(|i| (i.wrapping_mul(2654435761) >> 24) as u8).collect();

    for round in 0..3u8 {
        let mut body = page.clone();
        body[1000] = round;

        let mut wire = BytesMut::new();
        client.encode(&body, &mut wire)?;
        client.flush(&mut wire);

        let mut plain = BytesMut::new();
        server.decode(&wire, &mut plain)?;
        server.finish()?;
        assert_eq!(&plain[..], &body[..]);

        println!(
            "round {}: {} raw bytes -> {} on the wire ({} declares, {} references)",
            round,
            body.len(),
            wire.len(),
            client.encoder().counts().declarations,
            client.encoder().counts().references,
        );

        client.encoder_mut().reset();
        server.decoder_mut().reset();
    }

    if let Some(stats) = client.stats() {
        println!(
            "\nTotal: {} bytes in, {} bytes out, {} saved",
            stats.request_input_bytes,
            stats.request_output_bytes,
            stats.request_saved_bytes()
        );
    }

    Ok(())
}
