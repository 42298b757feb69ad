// src/formats/imd.rs
use std::io::{Cursor, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};
use log::{debug, trace};

use super::{DiskMeta, ImageSink, SectorStatus, Track, TrackStatus};
use crate::{Error, Result};

pub const COMMENT_TERMINATOR: u8 = 0x1A;
pub const CYL_MAP_FLAG: u8 = 0x80;
pub const HEAD_MAP_FLAG: u8 = 0x40;
pub const HEAD_MASK: u8 = 0x0F;

/// Sector record type: 1 normal, 2 compressed, +2 deleted, +4 error.
fn record_type(compressed: bool, deleted: bool, status: SectorStatus) -> u8 {
    let mut kind = if compressed { 2 } else { 1 };
    if deleted {
        kind += 2;
    }
    if status == SectorStatus::Bad {
        kind += 4;
    }
    kind
}

fn is_uniform(data: &[u8]) -> bool {
    data.iter().all(|&b| b == data[0])
}

/// Streams IMD records to `W`, one track at a time.
pub struct ImdWriter<W: Write> {
    out: W,
    compressed_sectors: usize,
}

impl<W: Write> ImdWriter<W> {
    pub fn new(out: W) -> Self {
        ImdWriter { out, compressed_sectors: 0 }
    }

    pub fn compressed_sectors(&self) -> usize {
        self.compressed_sectors
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ImageSink for ImdWriter<W> {
    fn write_header(&mut self, meta: &DiskMeta) -> Result<()> {
        self.out.write_all(meta.comment.as_bytes())?;
        self.out.write_u8(COMMENT_TERMINATOR)?;
        self.out.flush()?;
        Ok(())
    }

    fn write_track(&mut self, track: Track) -> Result<()> {
        if track.status != TrackStatus::Probed {
            return Err(Error::IncompleteTrack { cylinder: track.phys_cyl, head: track.phys_head });
        }
        let cyl_map = track.sectors.iter().any(|s| s.log_cyl != track.phys_cyl);
        let head_map = track.sectors.iter().any(|s| s.log_head != track.phys_head);
        let mut head = track.phys_head & HEAD_MASK;
        if cyl_map {
            head |= CYL_MAP_FLAG;
        }
        if head_map {
            head |= HEAD_MAP_FLAG;
        }
        debug!(
            "Writing Cyl {}, Head {}: {} sectors, size {} bytes, mode {}",
            track.phys_cyl,
            track.phys_head,
            track.num_sectors(),
            track.sector_size(),
            track.mode
        );

        self.out.write_u8(track.mode.imd_mode())?;
        self.out.write_u8(track.phys_cyl)?;
        self.out.write_u8(head)?;
        self.out.write_u8(track.num_sectors() as u8)?;
        self.out.write_u8(track.size_code)?;
        for sector in &track.sectors {
            self.out.write_u8(sector.log_sector)?;
        }
        if cyl_map {
            for sector in &track.sectors {
                self.out.write_u8(sector.log_cyl)?;
            }
        }
        if head_map {
            for sector in &track.sectors {
                self.out.write_u8(sector.log_head)?;
            }
        }
        for sector in &track.sectors {
            if !sector.data.is_empty() && is_uniform(&sector.data) {
                self.out.write_u8(record_type(true, sector.deleted, sector.status))?;
                self.out.write_u8(sector.data[0])?;
                self.compressed_sectors += 1;
                trace!("  Sector {}: Compressed, value {}", sector.log_sector, sector.data[0]);
            } else {
                self.out.write_u8(record_type(false, sector.deleted, sector.status))?;
                self.out.write_all(&sector.data)?;
                trace!("  Sector {}: Normal, {} bytes", sector.log_sector, sector.data.len());
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Track header as found when scanning an IMD image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSummary {
    pub mode: u8,
    pub cylinder: u8,
    pub head: u8,
    pub sector_map: Vec<u8>,
    pub cylinder_map: Vec<u8>,
    pub head_map: Vec<u8>,
    pub sector_size: usize,
}

/// Shape of an IMD image, enough to check a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImdSummary {
    pub comment: String,
    pub tracks: Vec<TrackSummary>,
}

fn read_map(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    let mut map = vec![0u8; len];
    cursor.read_exact(&mut map)?;
    Ok(map)
}

impl ImdSummary {
    pub fn scan(data: &[u8]) -> Result<Self> {
        let header_end = data
            .iter()
            .position(|&b| b == COMMENT_TERMINATOR)
            .ok_or_else(|| Error::InvalidImage("no header terminator (0x1A)".to_string()))?;
        let comment = String::from_utf8_lossy(&data[..header_end]).into_owned();
        let body = &data[header_end + 1..];
        let mut cursor = Cursor::new(body);
        let mut tracks = Vec::new();

        while (cursor.position() as usize) < body.len() {
            let mode = cursor.read_u8()?;
            let cylinder = cursor.read_u8()?;
            let head = cursor.read_u8()?;
            let sector_count = cursor.read_u8()? as usize;
            let size_code = cursor.read_u8()?;
            let sector_size = 128usize << size_code;

            let sector_map = read_map(&mut cursor, sector_count)?;
            let cylinder_map = if head & CYL_MAP_FLAG != 0 { read_map(&mut cursor, sector_count)? } else { Vec::new() };
            let head_map = if head & HEAD_MAP_FLAG != 0 { read_map(&mut cursor, sector_count)? } else { Vec::new() };

            for _ in 0..sector_count {
                let type_byte = cursor.read_u8()?;
                match type_byte {
                    0 => {}
                    1 | 3 | 5 | 7 => cursor.set_position(cursor.position() + sector_size as u64),
                    2 | 4 | 6 | 8 => cursor.set_position(cursor.position() + 1),
                    _ => return Err(Error::InvalidImage(format!("unsupported sector type {}", type_byte))),
                }
            }
            if cursor.position() as usize > body.len() {
                return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
            }
            tracks.push(TrackSummary {
                mode,
                cylinder,
                head: head & HEAD_MASK,
                sector_map,
                cylinder_map,
                head_map,
                sector_size,
            });
        }
        Ok(ImdSummary { comment, tracks })
    }
}
