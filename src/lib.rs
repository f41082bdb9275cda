//! xcodec
//!
//! Streaming redundancy elimination for WAN-optimizing proxies.
//!
//! Two proxies at either end of a slow link each run an xcodec [`Codec`].
//! The sending side cuts its byte stream into content-defined chunks with a
//! rolling hash, names each chunk by its BLAKE3 hash, and sends:
//!
//! - a **Declare** frame (hash + bytes) the first time a chunk is seen,
//! - a **Reference** frame (hash only) every time after that,
//! - an **Escape** frame (literal bytes) for data that is not cached.
//!
//! The receiving side replays the same cache inserts in the same order, so
//! both caches stay in lockstep and every reference resolves.
//!
//! The crate intentionally:
//! - does NOT open sockets or run a proxy
//! - does NOT compress (the transport may, see [`CompressorConfig`])
//! - does NOT persist caches across processes
//!
//! It only does one thing: **bytes in → frames out, frames in → bytes out**
//!
//! # Sync
//!
//! ```
//! use bytes::BytesMut;
//! use xcodec::{CacheConfig, CacheEpoch, ChunkConfig, Codec, CodecConfig, CodecError};
//!
//! fn main() -> Result<(), CodecError> {
//!     let epoch = CacheEpoch::generate();
//!     let config = CodecConfig::new(ChunkConfig::default(), CacheConfig::memory(epoch))?;
//!     let mut client = Codec::new(config.clone())?;
//!     let mut server = Codec::new(config)?;
//!     client.accept(&server.hello())?;
//!     server.accept(&client.hello())?;
//!
//!     let payload = vec![42u8; 64 * 1024];
//!     let mut wire = BytesMut::new();
//!     client.encode(&payload, &mut wire)?;
//!     client.flush(&mut wire);
//!
//!     let mut plain = BytesMut::new();
//!     server.decode(&wire, &mut plain)?;
//!     server.finish()?;
//!     assert_eq!(&plain[..], &payload[..]);
//!     Ok(())
//! }
//! ```
//!
//! # Async (feature = "async-io")
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use xcodec::{encode_async, Codec};
//! use futures_io::AsyncRead;
//!
//! async fn demo<R: AsyncRead + Unpin>(reader: R, codec: Codec) -> xcodec::Result<()> {
//!     let (encoder, _) = codec.into_parts();
//!     let mut stream = encode_async(reader, encoder);
//!
//!     while let Some(coded) = stream.next().await {
//!         println!("{} coded bytes", coded?.len());
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod chunk;
mod codec;
mod config;
mod error;
mod frame;

mod cdc; // internal rolling hash
mod hash; // internal blake3 wrapper

#[cfg(feature = "async-io")]
mod async_stream;

//
// Public surface
//

pub use cache::{CacheEpoch, ChunkCache, Insert};
pub use cdc::{MAX_AVG_SIZE, RollingHash};
pub use chunk::{Chunk, ChunkHash};
pub use codec::{
    Codec, CodecStats, Decoder, Encoder, FrameCounts, HELLO_LEN, HELLO_MAGIC, Hello,
    PROTOCOL_VERSION, StreamState,
};
pub use config::{
    CacheBacking, CacheCapacity, CacheConfig, ChunkConfig, CodecConfig, CompressorConfig,
    DEFAULT_AVG_CHUNK_SIZE, DEFAULT_CACHE_BYTES, DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MIN_CHUNK_SIZE,
    MAX_COMPRESSOR_LEVEL,
};
pub use error::{CacheError, CodecError, ProtocolError, Result};
pub use frame::{Frame, HEADER_LEN, MAX_PAYLOAD_LEN, Opcode};
pub use hash::Blake3Hasher;

#[cfg(feature = "async-io")]
pub use async_stream::{
    CodecStream, DecodeStream, EncodeStream, StreamTransform, decode_async, encode_async,
};
