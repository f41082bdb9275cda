//! Async streaming support for the codec.
//!
//! This module wraps an [`Encoder`](crate::Encoder) or
//! [`Decoder`](crate::Decoder) around a `futures-io::AsyncRead`, so it works
//! with tokio (through `tokio_util::compat`), async-std, smol, and other
//! runtimes.
//!
//! - [`encode_async`] - raw reader to a stream of coded bytes
//! - [`decode_async`] - coded reader to a stream of raw bytes
//!
//! This module requires the `async-io` feature to be enabled.

mod stream;

pub use stream::{CodecStream, DecodeStream, EncodeStream, StreamTransform, decode_async, encode_async};
