// src/disk_formats/mod.rs

pub mod floppy_3_5inch_ibm;
pub mod floppy_5_25inch_ibm;
pub mod floppy_8inch_ibm;
pub mod logdisk;

pub use floppy_3_5inch_ibm::{IBM_720K, IBM_1_44M};
pub use floppy_5_25inch_ibm::{IBM_360K, IBM_1_2M};
pub use floppy_8inch_ibm::IBM_3740;

use std::str::FromStr;

use crate::mode::DataRate;
use crate::{Error, Result};

/// Nominal media diameter.  Only 5.25 and 8 inch change the default data rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeClass {
    #[default]
    Inch5,
    Inch8,
    Other(u32),
}

impl From<u32> for SizeClass {
    fn from(inches: u32) -> Self {
        match inches {
            5 => Self::Inch5,
            8 => Self::Inch8,
            n => Self::Other(n),
        }
    }
}

/// How the two sides of a double sided disk follow each other in the raw file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TwoSidePolicy {
    /// all of side 0, then all of side 1
    Continuation,
    /// cylinder 0 side 0, cylinder 0 side 1, cylinder 1 side 0, ...
    #[default]
    Interlace,
    /// interlaced, logical head always 0, side 1 numbered after side 0
    Kaypro,
}

impl TryFrom<u32> for TwoSidePolicy {
    type Error = String;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Continuation),
            1 => Ok(Self::Interlace),
            2 => Ok(Self::Kaypro),
            n => Err(format!("unknown two-side policy {}", n)),
        }
    }
}

impl FromStr for TwoSidePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "continuation" | "cont" => Ok(Self::Continuation),
            "interlace" | "interlaced" => Ok(Self::Interlace),
            "kaypro" => Ok(Self::Kaypro),
            other => other
                .parse::<u32>()
                .map_err(|_| format!("Invalid policy: {} (continuation, interlace or kaypro)", other))
                .and_then(Self::try_from),
        }
    }
}

/// IMD size code for a sector length.
pub fn size_code(sector_length: u32) -> Result<u8> {
    match sector_length {
        128 => Ok(0),
        256 => Ok(1),
        512 => Ok(2),
        1024 => Ok(3),
        n => Err(Error::UnsupportedSectorLength(n)),
    }
}

/// A known raw format, used to fill in geometry from the file size alone.
#[derive(Debug, Clone, Copy)]
pub struct DiskFormat {
    pub cylinders: u8,
    pub heads: u8,
    pub sectors_per_track: u8,
    pub sector_size: u16,
    pub size: SizeClass,
    pub mfm: bool,
    pub data_rate: Option<DataRate>,
    pub name: &'static str,
}

impl DiskFormat {
    /// Calculates the total size in bytes for this disk format.
    pub fn total_size(&self) -> u64 {
        self.cylinders as u64 * self.heads as u64 * self.sectors_per_track as u64 * self.sector_size as u64
    }

    pub fn geometry(&self) -> PartialGeometry {
        PartialGeometry {
            cylinders: Some(self.cylinders as u32),
            heads: Some(self.heads as u32),
            sectors: Some(self.sectors_per_track as u32),
            sector_length: Some(self.sector_size as u32),
            size: Some(self.size),
            mfm: Some(self.mfm),
            data_rate: self.data_rate,
            ..PartialGeometry::default()
        }
    }
}

/// Infers the disk format based on payload size.
pub fn infer_format(size: u64) -> Option<&'static DiskFormat> {
    floppy_5_25inch_ibm::infer_format(size)
        .or_else(|| floppy_3_5inch_ibm::infer_format(size))
        .or_else(|| floppy_8inch_ibm::infer_format(size))
}

/// Geometry as gathered from presets, the logdisk trailer and the command
/// line.  Any field may still be unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialGeometry {
    pub cylinders: Option<u32>,
    pub heads: Option<u32>,
    pub sectors: Option<u32>,
    pub sector_length: Option<u32>,
    pub size: Option<SizeClass>,
    pub mfm: Option<bool>,
    pub data_rate: Option<DataRate>,
    pub policy: Option<TwoSidePolicy>,
    pub skew: [Option<i32>; 2],
    pub offset: [Option<u32>; 2],
}

impl PartialGeometry {
    /// Fields set in `over` replace the ones in `self`.
    pub fn merge(self, over: PartialGeometry) -> PartialGeometry {
        PartialGeometry {
            cylinders: over.cylinders.or(self.cylinders),
            heads: over.heads.or(self.heads),
            sectors: over.sectors.or(self.sectors),
            sector_length: over.sector_length.or(self.sector_length),
            size: over.size.or(self.size),
            mfm: over.mfm.or(self.mfm),
            data_rate: over.data_rate.or(self.data_rate),
            policy: over.policy.or(self.policy),
            skew: [over.skew[0].or(self.skew[0]), over.skew[1].or(self.skew[1])],
            offset: [over.offset[0].or(self.offset[0]), over.offset[1].or(self.offset[1])],
        }
    }

    /// True when cylinders, heads, sectors and sector length are all known.
    pub fn is_complete(&self) -> bool {
        self.cylinders.is_some() && self.heads.is_some() && self.sectors.is_some() && self.sector_length.is_some()
    }

    /// Apply defaults and check that IMD can represent the result.
    pub fn resolve(&self) -> Result<DiskGeometry> {
        let sector_length = self.sector_length.ok_or(Error::MissingGeometry("sector length"))?;
        let size_code = size_code(sector_length)?;
        let cylinders = self.cylinders.ok_or(Error::MissingGeometry("cylinders"))?;
        let heads = self.heads.ok_or(Error::MissingGeometry("heads"))?;
        let sectors = self.sectors.ok_or(Error::MissingGeometry("sectors per track"))?;
        if cylinders > 255 {
            return Err(Error::InvalidGeometry(format!("{} cylinders, at most 255", cylinders)));
        }
        if !(1..=2).contains(&heads) {
            return Err(Error::InvalidGeometry(format!("{} heads, expected 1 or 2", heads)));
        }
        if !(1..=255).contains(&sectors) {
            return Err(Error::InvalidGeometry(format!("{} sectors per track, expected 1 to 255", sectors)));
        }
        let policy = self.policy.unwrap_or_default();
        // Kaypro numbers side 0 from 0 and side 1 straight after it
        let offset0 = self.offset[0].unwrap_or(if policy == TwoSidePolicy::Kaypro { 0 } else { 1 });
        let offset1 = self.offset[1].unwrap_or(if policy == TwoSidePolicy::Kaypro { sectors } else { offset0 });
        for offset in [offset0, offset1] {
            if offset as u64 + sectors as u64 - 1 > 255 {
                return Err(Error::InvalidGeometry(format!(
                    "sector offset {} with {} sectors exceeds sector number 255",
                    offset, sectors
                )));
            }
        }
        let skew0 = self.skew[0].unwrap_or(1);
        let skew1 = self.skew[1].unwrap_or(skew0);
        Ok(DiskGeometry {
            cylinders: cylinders as u8,
            heads: heads as u8,
            sectors_per_track: sectors as u8,
            sector_length: sector_length as usize,
            size_code,
            size: self.size.unwrap_or_default(),
            mfm: self.mfm.unwrap_or(false),
            data_rate: self.data_rate,
            policy,
            skew: [skew0, skew1],
            offset: [offset0 as u8, offset1 as u8],
        })
    }
}

/// Fully resolved geometry of the raw file.  Built once, never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskGeometry {
    pub cylinders: u8,
    pub heads: u8,
    pub sectors_per_track: u8,
    pub sector_length: usize,
    pub size_code: u8,
    pub size: SizeClass,
    pub mfm: bool,
    pub data_rate: Option<DataRate>,
    pub policy: TwoSidePolicy,
    /// skew factor per side
    pub skew: [i32; 2],
    /// first logical sector number per side
    pub offset: [u8; 2],
}

impl DiskGeometry {
    pub fn track_size(&self) -> u64 {
        self.sectors_per_track as u64 * self.sector_length as u64
    }

    /// Calculates the payload size in bytes the raw file must hold.
    pub fn total_size(&self) -> u64 {
        self.cylinders as u64 * self.heads as u64 * self.track_size()
    }

    pub fn side_offset(&self, head: u8) -> u8 {
        if head > 0 {
            self.offset[1]
        } else {
            self.offset[0]
        }
    }
}
