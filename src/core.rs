// src/core.rs
//! Geometry translation: reads the raw dump track by track and labels each
//! sector with its physical slot and logical address.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use log::{debug, info, trace, warn};

use crate::disk_formats::logdisk::TRAILER_LEN;
use crate::disk_formats::{DiskGeometry, TwoSidePolicy};
use crate::formats::{DiskMeta, ImageSink, Sector, SectorStatus, Track, TrackStatus};
use crate::mode::{resolve_mode, EncodingMode};
use crate::skew::SkewTable;
use crate::{Error, Result};

/// Behaviour flags that are not part of the geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    /// accept a raw file larger than the geometry
    pub ignore_excess: bool,
    /// accept a raw file smaller than the geometry
    pub force_short: bool,
    /// the raw file ends with a logdisk trailer that is not sector data
    pub logdisk_trailer: bool,
}

/// Byte offset of a track when the sides follow each other
/// (continuation layout).
pub fn track_offset(geometry: &DiskGeometry, cyl: u8, head: u8) -> u64 {
    (head as u64 * geometry.cylinders as u64 + cyl as u64) * geometry.track_size()
}

/// Read one track from `source` and label its sectors.  Bytes arrive in
/// logical order; `skew` decides which physical slot each sector lands in.
/// Logical sector numbers follow arrival order.
pub fn map_track<R: Read + Seek>(
    cyl: u8,
    head: u8,
    geometry: &DiskGeometry,
    mode: EncodingMode,
    skew: Option<&SkewTable>,
    source: &mut R,
) -> Result<Track> {
    let count = geometry.sectors_per_track as usize;
    if let Some(table) = skew.filter(|table| table.len() != count) {
        return Err(Error::InvalidGeometry(format!(
            "skew table covers {} sectors, track has {}",
            table.len(),
            count
        )));
    }
    if geometry.policy == TwoSidePolicy::Continuation {
        let offset = track_offset(geometry, cyl, head);
        trace!("seek to {} for cylinder {} head {}", offset, cyl, head);
        source
            .seek(SeekFrom::Start(offset))
            .map_err(|e| Error::Seek { offset, source: e })?;
    }
    let log_head = match geometry.policy {
        TwoSidePolicy::Kaypro => 0,
        _ => head,
    };
    let offset = geometry.side_offset(head);
    let mut slots: Vec<Option<Sector>> = vec![None; count];

    for s in 0..count {
        let mut data = vec![0u8; geometry.sector_length];
        source.read_exact(&mut data).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Error::ShortRead { cylinder: cyl, head, sector: s },
            _ => Error::Io(e),
        })?;
        let slot = skew.map_or(s, |table| table.slot(s));
        let log_sector = s as u8 + offset;
        trace!("cyl {} head {}: arrival {} -> slot {}, sector {}", cyl, head, s, slot, log_sector);
        slots[slot] = Some(Sector {
            log_cyl: cyl,
            log_head,
            log_sector,
            deleted: false,
            status: SectorStatus::Good,
            data,
        });
    }

    let sectors = slots
        .into_iter()
        .collect::<Option<Vec<Sector>>>()
        .ok_or(Error::IncompleteTrack { cylinder: cyl, head })?;
    Ok(Track {
        phys_cyl: cyl,
        phys_head: head,
        mode,
        size_code: geometry.size_code,
        status: TrackStatus::Probed,
        sectors,
    })
}

/// A resolved conversion: geometry, encoding and skew tables, ready to run
/// against a raw source.
#[derive(Debug, Clone)]
pub struct Conversion {
    geometry: DiskGeometry,
    mode: EncodingMode,
    skew: [Option<SkewTable>; 2],
    options: ConvertOptions,
}

impl Conversion {
    pub fn new(geometry: DiskGeometry, options: ConvertOptions) -> Self {
        let mode = resolve_mode(geometry.size, geometry.mfm, geometry.data_rate);
        let sectors = geometry.sectors_per_track as usize;
        let skew = geometry
            .skew
            .map(|k| (k.unsigned_abs() > 1).then(|| SkewTable::build(k, sectors)));
        Conversion { geometry, mode, skew, options }
    }

    pub fn geometry(&self) -> &DiskGeometry {
        &self.geometry
    }

    pub fn mode(&self) -> EncodingMode {
        self.mode
    }

    /// Skew table for a side, `None` when the side has no interleave.
    pub fn skew_table(&self, head: u8) -> Option<&SkewTable> {
        self.skew[usize::from(head > 0)].as_ref()
    }

    /// Compare the raw file length against the geometry.  Returns the
    /// payload length, i.e. without the logdisk trailer.
    pub fn check_capacity(&self, source_len: u64) -> Result<u64> {
        let actual = if self.options.logdisk_trailer {
            source_len.saturating_sub(TRAILER_LEN as u64)
        } else {
            source_len
        };
        let expected = self.geometry.total_size();
        if actual > expected {
            if !self.options.ignore_excess {
                return Err(Error::ImageTooLarge { actual, expected });
            }
            warn!("ignoring {} bytes past the end of the geometry", actual - expected);
        } else if actual < expected {
            if !self.options.force_short {
                return Err(Error::ImageTooSmall { actual, expected });
            }
            warn!("raw file is {} bytes short of the geometry", expected - actual);
        }
        Ok(actual)
    }

    /// Convert the whole disk, handing each track to `sink` as soon as it is
    /// complete.  Stops at the first failure; tracks already written stay
    /// in the sink.
    pub fn run<R: Read + Seek, S: ImageSink>(&self, source: &mut R, sink: &mut S, meta: &DiskMeta) -> Result<()> {
        let source_len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;
        let payload = self.check_capacity(source_len)?;
        let geom = &self.geometry;
        info!(
            "{} cylinders, {} heads, {} sectors of {} bytes, {}, {:?} layout, {} bytes",
            geom.cylinders, geom.heads, geom.sectors_per_track, geom.sector_length, self.mode, geom.policy, payload
        );

        sink.write_header(meta)?;
        for cyl in 0..geom.cylinders {
            for head in 0..geom.heads {
                let track = map_track(cyl, head, geom, self.mode, self.skew_table(head), source)?;
                debug!("Cyl {}, Head {}: {} sectors read", cyl, head, track.num_sectors());
                sink.write_track(track)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk_formats::PartialGeometry;
    use std::io::Cursor;

    fn geometry(cyl: u32, heads: u32, sectors: u32, length: u32) -> PartialGeometry {
        PartialGeometry {
            cylinders: Some(cyl),
            heads: Some(heads),
            sectors: Some(sectors),
            sector_length: Some(length),
            ..PartialGeometry::default()
        }
    }

    /// Every sector filled with its running index in the raw file.
    fn tagged_source(geom: &DiskGeometry) -> Vec<u8> {
        let total = geom.cylinders as usize * geom.heads as usize * geom.sectors_per_track as usize;
        (0..total).flat_map(|i| vec![i as u8; geom.sector_length]).collect()
    }

    #[derive(Default)]
    struct Recorder {
        headers: usize,
        tracks: Vec<Track>,
    }

    impl ImageSink for Recorder {
        fn write_header(&mut self, _meta: &DiskMeta) -> Result<()> {
            self.headers += 1;
            Ok(())
        }

        fn write_track(&mut self, track: Track) -> Result<()> {
            self.tracks.push(track);
            Ok(())
        }
    }

    #[test]
    fn continuation_offset() {
        let geom = geometry(80, 2, 9, 512).resolve().unwrap();
        assert_eq!(track_offset(&geom, 5, 1), 391_680);
        assert_eq!(track_offset(&geom, 5, 0), 5 * 9 * 512);
    }

    #[test]
    fn skewed_track_places_bytes_by_arrival() {
        let mut p = geometry(1, 1, 9, 128);
        p.skew[0] = Some(3);
        let geom = p.resolve().unwrap();
        let conv = Conversion::new(geom.clone(), ConvertOptions::default());
        let table = conv.skew_table(0).unwrap().clone();
        let mut source = Cursor::new(tagged_source(&geom));
        let track = map_track(0, 0, &geom, conv.mode(), Some(&table), &mut source).unwrap();
        for s in 0..9 {
            let sector = &track.sectors[table.slot(s)];
            assert!(sector.data.iter().all(|&b| b == s as u8));
            assert_eq!(sector.log_sector, s as u8 + 1);
        }
        let order: Vec<u8> = track.sectors.iter().map(|s| s.log_sector).collect();
        assert_eq!(order, vec![1, 4, 7, 2, 5, 8, 3, 6, 9]);
    }

    #[test]
    fn mismatched_skew_table_is_rejected() {
        let geom = geometry(1, 1, 9, 128).resolve().unwrap();
        let table = SkewTable::build(3, 10);
        let mut source = Cursor::new(tagged_source(&geom));
        let err = map_track(0, 0, &geom, EncodingMode::Mfm250K, Some(&table), &mut source).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry(_)));
        assert_eq!(source.position(), 0);
    }

    #[test]
    fn round_trip_through_driver() {
        let mut p = geometry(3, 2, 10, 256);
        p.skew = [Some(2), Some(-3)];
        let geom = p.resolve().unwrap();
        let conv = Conversion::new(geom.clone(), ConvertOptions::default());
        let mut source = Cursor::new(tagged_source(&geom));
        let mut sink = Recorder::default();
        conv.run(&mut source, &mut sink, &DiskMeta::new(3, 2)).unwrap();
        assert_eq!(sink.headers, 1);
        assert_eq!(sink.tracks.len(), 6);
        for (n, track) in sink.tracks.iter().enumerate() {
            assert_eq!(track.phys_cyl as usize, n / 2);
            assert_eq!(track.phys_head as usize, n % 2);
            let table = conv.skew_table(track.phys_head).unwrap();
            for s in 0..10 {
                let tag = (n * 10 + s) as u8;
                assert!(track.sectors[table.slot(s)].data.iter().all(|&b| b == tag));
            }
        }
    }

    #[test]
    fn continuation_reads_side_one_after_side_zero() {
        let mut p = geometry(2, 2, 2, 128);
        p.policy = Some(TwoSidePolicy::Continuation);
        let geom = p.resolve().unwrap();
        let conv = Conversion::new(geom.clone(), ConvertOptions::default());
        let mut source = Cursor::new(tagged_source(&geom));
        let mut sink = Recorder::default();
        conv.run(&mut source, &mut sink, &DiskMeta::new(2, 2)).unwrap();
        // raw sector index of each track's first sector: c0h0, c0h1, c1h0, c1h1
        let firsts: Vec<u8> = sink.tracks.iter().map(|t| t.sectors[0].data[0]).collect();
        assert_eq!(firsts, vec![0, 4, 2, 6]);
    }

    #[test]
    fn kaypro_logical_head_is_zero() {
        let mut p = geometry(2, 2, 10, 512);
        p.policy = Some(TwoSidePolicy::Kaypro);
        let geom = p.resolve().unwrap();
        let conv = Conversion::new(geom.clone(), ConvertOptions::default());
        let mut source = Cursor::new(tagged_source(&geom));
        let mut sink = Recorder::default();
        conv.run(&mut source, &mut sink, &DiskMeta::new(2, 2)).unwrap();
        for track in &sink.tracks {
            assert!(track.sectors.iter().all(|s| s.log_head == 0));
            let first = if track.phys_head == 0 { 0 } else { 10 };
            let numbers: Vec<u8> = track.sectors.iter().map(|s| s.log_sector).collect();
            assert_eq!(numbers, (first..first + 10).collect::<Vec<u8>>());
        }
        // interlaced: second track is cylinder 0 side 1
        assert_eq!(sink.tracks[1].sectors[0].data[0], 10);
    }

    #[test]
    fn oversize_source_aborts_before_writing() {
        let geom = geometry(40, 2, 9, 512).resolve().unwrap();
        let conv = Conversion::new(geom, ConvertOptions::default());
        let mut source = Cursor::new(vec![0u8; 800_000]);
        let mut sink = Recorder::default();
        let err = conv.run(&mut source, &mut sink, &DiskMeta::new(40, 2)).unwrap_err();
        assert!(matches!(err, Error::ImageTooLarge { actual: 800_000, expected: 368_640 }));
        assert_eq!(sink.headers, 0);
        assert!(sink.tracks.is_empty());
    }

    #[test]
    fn capacity_overrides_and_trailer() {
        let geom = geometry(40, 2, 9, 512).resolve().unwrap();
        let lenient = ConvertOptions { ignore_excess: true, force_short: true, ..ConvertOptions::default() };
        let conv = Conversion::new(geom.clone(), lenient);
        assert_eq!(conv.check_capacity(800_000).unwrap(), 800_000);
        assert_eq!(conv.check_capacity(1_000).unwrap(), 1_000);
        let strict = Conversion::new(geom.clone(), ConvertOptions::default());
        assert!(matches!(strict.check_capacity(368_639), Err(Error::ImageTooSmall { .. })));
        assert!(matches!(strict.check_capacity(368_640 + 128), Err(Error::ImageTooLarge { .. })));
        let trailer = ConvertOptions { logdisk_trailer: true, ..ConvertOptions::default() };
        let conv = Conversion::new(geom, trailer);
        assert_eq!(conv.check_capacity(368_640 + 128).unwrap(), 368_640);
    }

    #[test]
    fn forced_short_source_stops_at_missing_sector() {
        let geom = geometry(2, 1, 4, 128).resolve().unwrap();
        let options = ConvertOptions { force_short: true, ..ConvertOptions::default() };
        let conv = Conversion::new(geom.clone(), options);
        let mut data = tagged_source(&geom);
        data.truncate(6 * 128);
        let mut source = Cursor::new(data);
        let mut sink = Recorder::default();
        let err = conv.run(&mut source, &mut sink, &DiskMeta::new(2, 1)).unwrap_err();
        assert!(matches!(err, Error::ShortRead { cylinder: 1, head: 0, sector: 2 }));
        assert_eq!(sink.tracks.len(), 1);
    }

    #[test]
    fn mode_follows_geometry() {
        let mut p = geometry(77, 1, 26, 128);
        p.size = Some(crate::disk_formats::SizeClass::Inch8);
        let conv = Conversion::new(p.resolve().unwrap(), ConvertOptions::default());
        assert_eq!(conv.mode(), EncodingMode::Fm500K);
        assert!(conv.skew_table(0).is_none());
    }
}
