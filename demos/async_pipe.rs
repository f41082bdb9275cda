//! Async encode/decode over an in-memory duplex pipe.
//!
//! Run with:
//!     cargo run --example async_pipe --features async-io

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::compat::TokioAsyncReadCompatExt;
use xcodec::{CacheConfig, CacheEpoch, ChunkConfig, Codec, CodecConfig, decode_async, encode_async};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let epoch = CacheEpoch::generate();
    let config = CodecConfig::new(ChunkConfig::new(256, 1024, 4096)?, CacheConfig::memory(epoch))?;

    let mut local = Codec::new(config.clone())?;
    let mut remote = Codec::new(config)?;
    local.accept(&remote.hello())?;
    remote.accept(&local.hello())?;

    let (encoder, _) = local.into_parts();
    let (_, decoder) = remote.into_parts();

    let block: Vec<u8> = (0..50_000u32).map(|i| (i * 31 % 251) as u8).collect();
    let data = [block.clone(), block.clone(), block].concat();

    // Encoder side reads raw bytes and writes frames into the pipe
    let (mut link_tx, link_rx) = tokio::io::duplex(64 * 1024);
    let source = data.clone();
    let sender = tokio::spawn(async move {
        let mut coded = encode_async(&source[..], encoder);
        let mut sent = 0usize;
        while let Some(frames) = coded.next().await {
            let frames = frames?;
            sent += frames.len();
            link_tx.write_all(&frames).await?;
        }
        link_tx.shutdown().await?;
        Ok::<_, Box<dyn std::error::Error + Send + Sync>>(sent)
    });

    // Decoder side reads frames from the pipe
    let mut plain = Vec::with_capacity(data.len());
    let mut decoded = decode_async(link_rx.compat(), decoder);
    while let Some(bytes) = decoded.next().await {
        plain.extend_from_slice(&bytes?);
    }

    let sent = sender.await?.map_err(|e| e.to_string())?;
    assert_eq!(plain, data);
    println!("{} raw bytes crossed the link as {} coded bytes", data.len(), sent);

    Ok(())
}
