//! opustags - view and edit the comment header of Ogg Opus streams
//!
//! The stream is processed in a single pass: the two header packets are
//! extracted from their pages, the comment header is decoded, edited and
//! re-encoded, and every following page is copied verbatim.
//!
//! ```no_run
//! use opustags::{rewrite, EditPolicy};
//! use std::fs::File;
//!
//! # fn main() -> opustags::Result<()> {
//! let policy = EditPolicy {
//!     to_add: vec![b"ARTIST=Someone".to_vec()],
//!     ..Default::default()
//! };
//! let input = File::open("in.opus")?;
//! let output = File::create("out.opus")?;
//! rewrite(input, output, &policy)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod ogg;
pub mod opus;
pub mod process;
pub mod utils;

pub use error::{Error, Result, Status};
pub use crate::ogg::{OggPage, OggReader, OggWriter, Packet};
pub use opus::{validate_identification_header, OpusHead, OpusTags};
pub use process::{inspect, rewrite, EditPolicy};
