//! Content-Defined Chunking (CDC) boundary detection.
//!
//! Boundaries are chosen by content, not position, so an insertion or
//! deletion only disturbs the chunks that touch it.
//!
//! - [`RollingHash`] - windowed buzhash with normalized boundary masks

mod rolling;

pub use rolling::{MAX_AVG_SIZE, RollingHash};
