use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser};
use log::info;
use std::fs::File;
use std::io::{BufReader, BufWriter, IsTerminal, Read};
use std::path::PathBuf;

use raw2imd::disk_formats::{self, logdisk, PartialGeometry, SizeClass, TwoSidePolicy};
use raw2imd::formats::imd::{ImdSummary, ImdWriter};
use raw2imd::formats::{DiskMeta, NullSink};
use raw2imd::mode::DataRate;
use raw2imd::{Conversion, ConvertOptions, DiskGeometry};

#[derive(Parser)]
#[command(
    version,
    about = "Convert a raw floppy sector dump to an ImageDisk (IMD) image",
    disable_help_flag = true,
    after_help = "Set RUST_LOG to override the -v logging level."
)]
struct Cli {
    /// raw represents a 5.25" diskette (default)
    #[arg(short = '5', conflicts_with = "eight")]
    five: bool,
    /// raw represents an 8" diskette
    #[arg(short = '8')]
    eight: bool,
    /// number of cylinders
    #[arg(short = 'c', long)]
    cylinders: Option<u32>,
    /// number of heads (sides)
    #[arg(short = 'h', long)]
    heads: Option<u32>,
    /// number of sectors per track
    #[arg(short = 's', long)]
    sectors: Option<u32>,
    /// sector length in bytes (128, 256, 512 or 1024)
    #[arg(short = 'l', long)]
    length: Option<u32>,
    /// raw represents MFM (double density)
    #[arg(short = 'm', long)]
    mfm: bool,
    /// data rate override in kbps (250, 300, 500 or 1000)
    #[arg(short = 'r', long)]
    rate: Option<DataRate>,
    /// sector skew for side 0
    #[arg(short = 'k', long, allow_negative_numbers = true)]
    skew: Option<i32>,
    /// sector skew for side 1 (defaults to -k)
    #[arg(short = 'K', long, allow_negative_numbers = true)]
    skew1: Option<i32>,
    /// first sector number on side 0 (1, or 0 for kaypro)
    #[arg(short = 'o', long)]
    offset: Option<u32>,
    /// first sector number on side 1 (defaults to -o, or sectors/track for kaypro)
    #[arg(short = 'O', long)]
    offset1: Option<u32>,
    /// two-side layout: continuation, interlace or kaypro
    #[arg(short = 'p', long)]
    policy: Option<TwoSidePolicy>,
    /// raw file ends with a logdisk geometry trailer
    #[arg(short = 'L', long)]
    logdisk: bool,
    /// ignore extra data in raw file
    #[arg(short = 'i', long)]
    ignore: bool,
    /// force using a smaller raw file
    #[arg(short = 'f', long)]
    force: bool,
    /// read comment from stdin
    #[arg(short = 'C')]
    read_comment: bool,
    /// use TEXT as comment
    #[arg(short = 'T', long, value_name = "TEXT")]
    title: Option<String>,
    /// more logging, repeat for more detail
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    /// re-read the written image and check it against the geometry
    #[arg(long)]
    validate: bool,
    /// print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
    #[arg(value_name = "RAW-FILE")]
    raw: PathBuf,
    #[arg(value_name = "IMAGE-FILE")]
    image: Option<PathBuf>,
}

impl Cli {
    fn geometry(&self) -> PartialGeometry {
        let size = if self.eight {
            Some(SizeClass::Inch8)
        } else if self.five {
            Some(SizeClass::Inch5)
        } else {
            None
        };
        PartialGeometry {
            cylinders: self.cylinders,
            heads: self.heads,
            sectors: self.sectors,
            sector_length: self.length,
            size,
            mfm: self.mfm.then_some(true),
            data_rate: self.rate,
            policy: self.policy,
            skew: [self.skew, self.skew1],
            offset: [self.offset, self.offset1],
        }
    }

    fn options(&self) -> ConvertOptions {
        ConvertOptions { ignore_excess: self.ignore, force_short: self.force, logdisk_trailer: self.logdisk }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn build_meta(cli: &Cli, geometry: &DiskGeometry) -> Result<DiskMeta> {
    let mut meta = DiskMeta::new(geometry.cylinders, geometry.heads);
    if let Some(title) = &cli.title {
        meta.append_comment(title);
    }
    if cli.read_comment {
        let mut stdin = std::io::stdin();
        if stdin.is_terminal() {
            eprintln!("Enter comment, terminated by EOF");
        }
        let mut text = String::new();
        stdin.read_to_string(&mut text).context("read from stdin failed")?;
        meta.append_comment(&text);
    }
    Ok(meta)
}

fn validate(path: &PathBuf, geometry: &DiskGeometry) -> Result<()> {
    let data = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let summary = ImdSummary::scan(&data)?;
    let expected = geometry.cylinders as usize * geometry.heads as usize;
    if summary.tracks.len() != expected {
        return Err(anyhow!("Validation failed: {} tracks written, geometry has {}", summary.tracks.len(), expected));
    }
    for track in &summary.tracks {
        if track.sector_map.len() != geometry.sectors_per_track as usize || track.sector_size != geometry.sector_length {
            return Err(anyhow!(
                "Validation failed: track {}.{} holds {} sectors of {} bytes",
                track.cylinder, track.head, track.sector_map.len(), track.sector_size
            ));
        }
    }
    println!("Validation passed: {} tracks match the geometry", summary.tracks.len());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let file = File::open(&cli.raw).with_context(|| format!("cannot open {}", cli.raw.display()))?;
    let source_len = file.metadata()?.len();
    let mut raw = BufReader::new(file);

    let mut partial = if cli.logdisk {
        logdisk::read_trailer(&mut raw)?.merge(cli.geometry())
    } else {
        cli.geometry()
    };
    if !partial.is_complete() {
        let payload_len = if cli.logdisk {
            source_len.saturating_sub(logdisk::TRAILER_LEN as u64)
        } else {
            source_len
        };
        if let Some(format) = disk_formats::infer_format(payload_len) {
            info!("geometry inferred from file size: {}", format.name);
            partial = format.geometry().merge(partial);
        }
    }
    let geometry = partial.resolve()?;
    let conversion = Conversion::new(geometry.clone(), cli.options());
    // reject a mis-sized raw file before prompting for a comment or touching the image
    conversion.check_capacity(source_len)?;
    let meta = build_meta(&cli, &geometry)?;

    match &cli.image {
        Some(path) => {
            let out = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
            let mut writer = ImdWriter::new(BufWriter::new(out));
            conversion.run(&mut raw, &mut writer, &meta)?;
            info!("{} sectors compressed", writer.compressed_sectors());
            drop(writer);
            if cli.validate {
                validate(path, &geometry)?;
            }
            println!("Converted to {}", path.display());
        }
        None => {
            let mut sink = NullSink::default();
            conversion.run(&mut raw, &mut sink, &meta)?;
            println!("Read {} tracks, no image file given", sink.tracks);
        }
    }
    Ok(())
}
