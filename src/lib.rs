//! # `raw2imd` library
//!
//! Turns a flat raw sector dump into an ImageDisk (IMD) image.
//!
//! The raw file carries no geometry of its own, so the caller declares it
//! (or lets it be sniffed from the file size or a logdisk trailer) as a
//! `disk_formats::DiskGeometry`.  From there:
//! * `mode` picks the IMD data rate/encoding for the whole disk
//! * `skew` builds the interleave permutation for each side
//! * `core` walks the raw file track by track and labels every sector
//! * `formats::imd` serializes each finished track as soon as it is ready

pub mod core;
pub mod disk_formats;
pub mod formats;
pub mod mode;
pub mod skew;

pub use crate::core::{Conversion, ConvertOptions};
pub use crate::disk_formats::{DiskGeometry, PartialGeometry, SizeClass, TwoSidePolicy};
pub use crate::formats::{DiskMeta, ImageSink, Sector, Track};
pub use crate::mode::{DataRate, EncodingMode};
pub use crate::skew::SkewTable;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unsupported sector length {0}")]
    UnsupportedSectorLength(u32),
    #[error("missing geometry: {0} not given and could not be inferred")]
    MissingGeometry(&'static str),
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("invalid IMD image: {0}")]
    InvalidImage(String),
    #[error("invalid trailer: {0}")]
    InvalidTrailer(String),
    #[error("image file too large: {actual} bytes, geometry expects {expected}")]
    ImageTooLarge { actual: u64, expected: u64 },
    #[error("image file too small: {actual} bytes, geometry expects {expected}")]
    ImageTooSmall { actual: u64, expected: u64 },
    #[error("short read at cylinder {cylinder}, head {head}, sector index {sector}")]
    ShortRead { cylinder: u8, head: u8, sector: usize },
    #[error("cannot seek to offset {offset}")]
    Seek { offset: u64, #[source] source: std::io::Error },
    #[error("track at cylinder {cylinder}, head {head} was never populated")]
    IncompleteTrack { cylinder: u8, head: u8 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
