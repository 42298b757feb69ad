// src/disk_formats/floppy_8inch_ibm.rs

use super::{DiskFormat, SizeClass};

/// IBM 3740 single sided single density, the standard CP/M 8" distribution disk.
pub const IBM_3740: DiskFormat = DiskFormat {
    cylinders: 77,
    heads: 1,
    sectors_per_track: 26,
    sector_size: 128,
    size: SizeClass::Inch8,
    mfm: false,
    data_rate: None,
    name: "250K 8\" SSSD",
};

pub fn infer_format(size: u64) -> Option<&'static DiskFormat> {
    match size {
        256_256 => Some(&IBM_3740),
        _ => None,
    }
}
