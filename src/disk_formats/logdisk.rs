//! ## Logdisk trailer
//!
//! Some simulator dumps end with a 128 byte ASCII descriptor such as
//! `5m512z9p2s80t1d0i1l0h`: a run of `<decimal><tag>` tokens closed by a
//! newline or NUL.

use std::io::{Read, Seek, SeekFrom};

use log::{debug, trace};

use super::{PartialGeometry, SizeClass, TwoSidePolicy};
use crate::{Error, Result};

/// Length of the trailer window at the end of the raw file.
pub const TRAILER_LEN: usize = 128;

/// Parse the trailer window.  Sector offsets are left unset so the usual
/// policy dependent defaults apply when the geometry is resolved.
pub fn parse_trailer(bytes: &[u8]) -> Result<PartialGeometry> {
    let mut geom = PartialGeometry::default();
    let mut value: Option<u32> = None;
    for &b in bytes {
        if b == b'\n' || b == 0 {
            break;
        }
        if b.is_ascii_digit() {
            let digit = (b - b'0') as u32;
            let next = value
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| Error::InvalidTrailer("number out of range".to_string()))?;
            value = Some(next);
            continue;
        }
        let n = value.take().unwrap_or(0);
        trace!("trailer token {}{}", n, b as char);
        match b {
            b'm' => geom.size = Some(SizeClass::from(n)),
            b'z' => geom.sector_length = Some(n),
            b'p' => geom.sectors = Some(n),
            b's' => geom.heads = Some(n),
            b't' => geom.cylinders = Some(n),
            b'd' => geom.mfm = Some(n != 0),
            b'i' => geom.policy = Some(TwoSidePolicy::try_from(n).map_err(Error::InvalidTrailer)?),
            // logical skew and hard sectoring do not change the image
            b'l' | b'h' => {}
            other => {
                return Err(Error::InvalidTrailer(format!(
                    "unknown tag {:?}",
                    other as char
                )))
            }
        }
    }
    if value.is_some() {
        return Err(Error::InvalidTrailer("number without tag".to_string()));
    }
    debug!("trailer geometry {:?}", geom);
    Ok(geom)
}

/// Read and parse the trailer from the end of `source`, leaving the
/// cursor back at the start of the file.
pub fn read_trailer<R: Read + Seek>(source: &mut R) -> Result<PartialGeometry> {
    let len = source.seek(SeekFrom::End(0))?;
    if len < TRAILER_LEN as u64 {
        return Err(Error::InvalidTrailer(format!("file is only {} bytes", len)));
    }
    let mut window = [0u8; TRAILER_LEN];
    source.seek(SeekFrom::Start(len - TRAILER_LEN as u64))?;
    source.read_exact(&mut window)?;
    source.seek(SeekFrom::Start(0))?;
    parse_trailer(&window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn window(text: &str) -> [u8; TRAILER_LEN] {
        let mut buf = [0u8; TRAILER_LEN];
        buf[..text.len()].copy_from_slice(text.as_bytes());
        buf
    }

    #[test]
    fn parses_full_descriptor() {
        let geom = parse_trailer(&window("5m512z9p2s80t1d0i1l0h\n")).unwrap();
        assert_eq!(geom.size, Some(SizeClass::Inch5));
        assert_eq!(geom.sector_length, Some(512));
        assert_eq!(geom.sectors, Some(9));
        assert_eq!(geom.heads, Some(2));
        assert_eq!(geom.cylinders, Some(80));
        assert_eq!(geom.mfm, Some(true));
        assert_eq!(geom.policy, Some(TwoSidePolicy::Continuation));
        assert_eq!(geom.offset, [None, None]);
    }

    #[test]
    fn stops_at_terminator() {
        let geom = parse_trailer(&window("8m128z26p1s77t0d\nxyz")).unwrap();
        assert_eq!(geom.size, Some(SizeClass::Inch8));
        assert_eq!(geom.mfm, Some(false));
        assert_eq!(geom.policy, None);
    }

    #[test]
    fn kaypro_trailer_resolves_kaypro_offsets() {
        let geom = parse_trailer(&window("5m512z10p2s40t1d2i")).unwrap().resolve().unwrap();
        assert_eq!(geom.policy, TwoSidePolicy::Kaypro);
        assert_eq!(geom.offset, [0, 10]);
    }

    #[test]
    fn rejects_unknown_tag() {
        assert!(matches!(parse_trailer(&window("5m512q")), Err(Error::InvalidTrailer(_))));
        assert!(matches!(parse_trailer(&window("5m512")), Err(Error::InvalidTrailer(_))));
        assert!(matches!(parse_trailer(&window("7i")), Err(Error::InvalidTrailer(_))));
    }

    #[test]
    fn reads_from_end_of_source() {
        let mut data = vec![0xe5u8; 1024];
        data.extend_from_slice(&window("8m128z8p1s1t0d"));
        let mut source = Cursor::new(data);
        let geom = read_trailer(&mut source).unwrap();
        assert_eq!(geom.sectors, Some(8));
        assert_eq!(source.position(), 0);
        let mut short = Cursor::new(vec![0u8; 16]);
        assert!(matches!(read_trailer(&mut short), Err(Error::InvalidTrailer(_))));
    }
}
