//! Content-defined chunking
//!
//! - `sizer`: derives the target average chunk size from the input size
//! - `chunker`: splits content into chunk ranges around that average
//!
//! Boundaries depend only on the bytes and the average size, never on file
//! identity, which is what makes identical content chunk identically.

pub mod chunker;
pub mod sizer;
