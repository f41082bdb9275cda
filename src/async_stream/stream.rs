//! Async stream adapters.
//!
//! # Example
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use xcodec::{encode_async, Codec};
//! use futures_io::AsyncRead;
//!
//! async fn demo<R: AsyncRead + Unpin>(reader: R, codec: Codec) -> xcodec::Result<()> {
//!     let (encoder, _decoder) = codec.into_parts();
//!     let mut stream = encode_async(reader, encoder);
//!
//!     while let Some(coded) = stream.next().await {
//!         let coded = coded?;
//!         println!("{} coded bytes ready", coded.len());
//!     }
//!     Ok(())
//! }
//! ```

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_io::AsyncRead;
use pin_project_lite::pin_project;

use crate::codec::{Decoder, Encoder};
use crate::error::{CodecError, Result};

const READ_BUF_LEN: usize = 8192;

mod sealed {
    pub trait Sealed {}
    impl Sealed for crate::Encoder {}
    impl Sealed for crate::Decoder {}
}

/// One direction of the codec, as driven by [`CodecStream`].
///
/// Implemented for [`Encoder`] and [`Decoder`] only.
pub trait StreamTransform: sealed::Sealed {
    /// Feeds input bytes, appending whatever output is ready.
    fn feed(&mut self, input: &[u8], output: &mut BytesMut) -> Result<()>;

    /// Ends the stream, appending any final output.
    fn end(&mut self, output: &mut BytesMut) -> Result<()>;
}

impl StreamTransform for Encoder {
    fn feed(&mut self, input: &[u8], output: &mut BytesMut) -> Result<()> {
        self.encode(input, output)
    }

    fn end(&mut self, output: &mut BytesMut) -> Result<()> {
        self.flush(output);
        Ok(())
    }
}

impl StreamTransform for Decoder {
    fn feed(&mut self, input: &[u8], output: &mut BytesMut) -> Result<()> {
        self.decode(input, output)
    }

    fn end(&mut self, _output: &mut BytesMut) -> Result<()> {
        self.finish()
    }
}

pin_project! {
    /// A stream of output bytes produced by running a reader through the codec.
    ///
    /// Each item holds whatever output one read produced; reads that
    /// complete no frame or chunk yield nothing. The stream ends after the
    /// reader reaches EOF and the codec has been flushed or finished, or
    /// after the first error.
    pub struct CodecStream<R, T> {
        #[pin]
        reader: R,
        codec: T,
        read_buf: Box<[u8]>,
        output: BytesMut,
        finished: bool,
    }
}

/// Raw bytes in, coded bytes out.
pub type EncodeStream<R> = CodecStream<R, Encoder>;

/// Coded bytes in, raw bytes out.
pub type DecodeStream<R> = CodecStream<R, Decoder>;

impl<R, T: StreamTransform> CodecStream<R, T> {
    /// Wraps `reader` with `codec`.
    pub fn new(reader: R, codec: T) -> Self {
        Self {
            reader,
            codec,
            read_buf: vec![0u8; READ_BUF_LEN].into_boxed_slice(),
            output: BytesMut::new(),
            finished: false,
        }
    }

    /// Returns the codec half.
    pub fn codec(&self) -> &T {
        &self.codec
    }

    /// Consumes the stream, returning the codec half with its cache.
    pub fn into_codec(self) -> T {
        self.codec
    }
}

impl<R: AsyncRead, T: StreamTransform> Stream for CodecStream<R, T> {
    type Item = Result<Bytes, CodecError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.finished {
            return Poll::Ready(None);
        }

        loop {
            match this.reader.as_mut().poll_read(cx, &mut this.read_buf[..]) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Poll::Ready(Err(e)) => {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(CodecError::Io(e))));
                }
                Poll::Ready(Ok(0)) => {
                    // End of input - flush the encoder or check the decoder
                    *this.finished = true;
                    if let Err(e) = this.codec.end(this.output) {
                        return Poll::Ready(Some(Err(e)));
                    }
                    if this.output.is_empty() {
                        return Poll::Ready(None);
                    }
                    return Poll::Ready(Some(Ok(this.output.split().freeze())));
                }
                Poll::Ready(Ok(n)) => {
                    if let Err(e) = this.codec.feed(&this.read_buf[..n], this.output) {
                        *this.finished = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                    if !this.output.is_empty() {
                        return Poll::Ready(Some(Ok(this.output.split().freeze())));
                    }
                }
            }
        }
    }
}

/// Encodes everything `reader` yields.
///
/// For tokio readers, convert with `tokio_util::compat`:
///
/// ```ignore
/// use tokio_util::compat::TokioAsyncReadCompatExt;
///
/// let file = tokio::fs::File::open("payload.bin").await?;
/// let stream = xcodec::encode_async(file.compat(), encoder);
/// ```
pub fn encode_async<R: AsyncRead>(reader: R, encoder: Encoder) -> EncodeStream<R> {
    CodecStream::new(reader, encoder)
}

/// Decodes everything `reader` yields.
pub fn decode_async<R: AsyncRead>(reader: R, decoder: Decoder) -> DecodeStream<R> {
    CodecStream::new(reader, decoder)
}
