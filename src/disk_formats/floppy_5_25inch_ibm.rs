// src/disk_formats/floppy_5_25inch_ibm.rs

use super::{DiskFormat, SizeClass};
use crate::mode::DataRate;

/// 360K double density, 250kbps at 300rpm.
pub const IBM_360K: DiskFormat = DiskFormat {
    cylinders: 40,
    heads: 2,
    sectors_per_track: 9,
    sector_size: 512,
    size: SizeClass::Inch5,
    mfm: true,
    data_rate: None,
    name: "360K 5.25\" DD",
};

/// 1.2M high density needs the 500kbps rate spelled out.
pub const IBM_1_2M: DiskFormat = DiskFormat {
    cylinders: 80,
    heads: 2,
    sectors_per_track: 15,
    sector_size: 512,
    size: SizeClass::Inch5,
    mfm: true,
    data_rate: Some(DataRate::Kbps500),
    name: "1.2M 5.25\" HD",
};

pub fn infer_format(size: u64) -> Option<&'static DiskFormat> {
    match size {
        368_640 => Some(&IBM_360K),
        1_228_800 => Some(&IBM_1_2M),
        _ => None,
    }
}
