// src/formats/mod.rs

pub mod imd;

use log::{debug, trace};

use crate::mode::EncodingMode;
use crate::Result;

pub const IMD_VERSION: &str = "1.18";

/// Raw dumps always yield `Probed` tracks.  `ImageSink` implementations
/// refuse an `Unknown` track, i.e. one that was never filled from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    Unknown,
    Probed,
}

/// Raw dumps carry no CRC state, so converted sectors are always `Good`.
/// `Bad` selects the IMD data-error record types (5 to 8) in the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorStatus {
    Good,
    Bad,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sector {
    pub log_cyl: u8,
    pub log_head: u8,
    pub log_sector: u8,
    pub deleted: bool,
    pub status: SectorStatus,
    pub data: Vec<u8>,
}

/// One physical track, sectors indexed by physical slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub phys_cyl: u8,
    pub phys_head: u8,
    pub mode: EncodingMode,
    pub size_code: u8,
    pub status: TrackStatus,
    pub sectors: Vec<Sector>,
}

impl Track {
    pub fn num_sectors(&self) -> usize {
        self.sectors.len()
    }

    pub fn sector_size(&self) -> usize {
        128 << self.size_code
    }
}

/// Disk level data written once, ahead of the tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskMeta {
    /// signature line plus free text, without the 0x1A terminator
    pub comment: String,
    pub num_phys_cyls: u8,
    pub num_phys_heads: u8,
}

impl DiskMeta {
    /// Start the comment with the `IMD 1.18: DD/MM/YYYY HH:MM:SS` line.
    pub fn new(num_phys_cyls: u8, num_phys_heads: u8) -> Self {
        let now = chrono::Local::now().naive_local();
        let comment = format!("IMD {}: {}\r\n", IMD_VERSION, now.format("%d/%m/%Y %H:%M:%S"));
        debug!("header {}", comment.trim_end());
        Self { comment, num_phys_cyls, num_phys_heads }
    }

    pub fn append_comment(&mut self, text: &str) {
        self.comment.push_str(text);
    }
}

/// Destination for a converted disk: one header, then tracks in
/// cylinder-major, head-minor order.
pub trait ImageSink {
    fn write_header(&mut self, meta: &DiskMeta) -> Result<()>;
    fn write_track(&mut self, track: Track) -> Result<()>;
}

/// Sink for a dry run, only reports what would be written.
#[derive(Debug, Default)]
pub struct NullSink {
    pub tracks: usize,
}

impl ImageSink for NullSink {
    fn write_header(&mut self, meta: &DiskMeta) -> Result<()> {
        debug!("dry run for {} cylinders, {} heads", meta.num_phys_cyls, meta.num_phys_heads);
        Ok(())
    }

    fn write_track(&mut self, track: Track) -> Result<()> {
        trace!("dry run track {}.{}", track.phys_cyl, track.phys_head);
        self.tracks += 1;
        Ok(())
    }
}
