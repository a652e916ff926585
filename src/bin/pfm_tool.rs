//! PFM Tool Binary
//!
//! Command-line front end for creating, loading and inspecting PFM
//! structures.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pfm::error::FileKind;
use pfm::header::Mbr;
use pfm::record::Coord3;
use pfm::{BinCoord, CheckpointMode, Config, CreateParams, DepthRecord, Pfm, PfmError, Result, Validity};
use tracing_subscriber::{fmt, EnvFilter};

/// PFM Tool
#[derive(Parser, Debug)]
#[command(name = "pfm-tool")]
#[command(about = "Create, load and inspect PFM bathymetric structures")]
#[command(version)]
struct Args {
    /// Handle file of the structure
    handle: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new, empty structure
    Create {
        #[arg(long, allow_hyphen_values = true)]
        min_x: f64,
        #[arg(long, allow_hyphen_values = true)]
        min_y: f64,
        #[arg(long, allow_hyphen_values = true)]
        max_x: f64,
        #[arg(long, allow_hyphen_values = true)]
        max_y: f64,

        /// Bin size in mbr units, both axes
        #[arg(short, long)]
        bin_size: f64,

        #[arg(long, default_value = "-100", allow_hyphen_values = true)]
        min_depth: f32,

        #[arg(long, default_value = "12000")]
        max_depth: f32,

        /// Depth resolution is 1 / depth_scale
        #[arg(long, default_value = "100")]
        depth_scale: f32,

        /// The bounding rectangle is in projected units
        #[arg(long)]
        projected: bool,

        /// Bit width override file
        #[arg(long)]
        bit_config: Option<PathBuf>,
    },

    /// Print the header
    Info,

    /// Append soundings from a whitespace separated "x y z" text file
    Add {
        input: PathBuf,

        /// Input file type recorded in the list file
        #[arg(short = 't', long, default_value = "0")]
        file_type: i16,

        /// Buffer appends in the bin cache
        #[arg(long)]
        cached: bool,

        /// Take a checkpoint before loading
        #[arg(long)]
        checkpoint: bool,

        /// Recompute statistics of every bin touched
        #[arg(long)]
        recompute: bool,
    },

    /// Recompute bin statistics for the whole grid
    Recompute,

    /// Print one bin and its soundings
    Dump {
        #[arg(allow_hyphen_values = true)]
        x: f64,
        #[arg(allow_hyphen_values = true)]
        y: f64,
    },

    /// Print the bounding box of bins holding data
    Extent,

    /// Roll back an interrupted load
    Recover,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,pfm=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.code().unsigned_abs().min(255) as u8)
        }
    }
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Commands::Create {
            min_x,
            min_y,
            max_x,
            max_y,
            bin_size,
            min_depth,
            max_depth,
            depth_scale,
            projected,
            bit_config,
        } => {
            let mut params = CreateParams::new(Mbr::new(min_x, min_y, max_x, max_y), bin_size, bin_size)
                .depth_range(min_depth, max_depth, depth_scale);
            params.projected = projected;

            let mut config = Config::default();
            config.bit_config = bit_config;

            let pfm = Pfm::create(&args.handle, &params, config)?;
            println!(
                "Created {} ({} x {} bins)",
                args.handle.display(),
                pfm.header().bin_width,
                pfm.header().bin_height
            );
            pfm.close()
        }

        Commands::Info => {
            let pfm = Pfm::open(&args.handle, Config::builder().read_only(true).build())?;
            print_header(&pfm);
            pfm.close()
        }

        Commands::Add {
            input,
            file_type,
            cached,
            checkpoint,
            recompute,
        } => {
            let mode = if checkpoint {
                CheckpointMode::Snapshot
            } else {
                CheckpointMode::Off
            };
            let config = Config::builder().checkpoint(mode).cache_enabled(cached).build();
            let mut pfm = Pfm::open(&args.handle, config)?;
            load_soundings(&mut pfm, &input, file_type, recompute)?;
            pfm.close()
        }

        Commands::Recompute => {
            let mut pfm = Pfm::open(&args.handle, Config::default())?;
            let grid = *pfm.grid();
            let mut updated = 0usize;
            for coord in grid.cells() {
                if pfm.read_bin(coord)?.num_soundings > 0 {
                    pfm.recompute_bin(coord, None)?;
                    updated += 1;
                }
            }
            pfm.refresh_summary()?;
            println!("Recomputed {} bins", updated);
            pfm.close()
        }

        Commands::Dump { x, y } => {
            let mut pfm = Pfm::open(&args.handle, Config::builder().read_only(true).build())?;
            let coord = pfm.coord_of(x, y)?;
            let bin = pfm.read_bin(coord)?;
            println!("Bin {}", coord);
            println!("  soundings        {}", bin.num_soundings);
            println!("  avg filtered     {}", bin.avg_filtered_depth);
            println!("  min/max filtered {} / {}", bin.min_filtered_depth, bin.max_filtered_depth);
            println!("  avg              {}", bin.avg_depth);
            println!("  min/max          {} / {}", bin.min_depth, bin.max_depth);
            println!("  std dev          {}", bin.standard_dev);
            println!("  validity         {:?}", bin.validity);
            println!("  coverage         {:?}", pfm.read_coverage(coord)?);
            for depth in pfm.read_depth_chain(coord)? {
                println!(
                    "  file {:5} line {:5} ping {:8} beam {:4}  {:.8} {:.8} {:.3}  {:?}",
                    depth.file_number,
                    depth.line_number,
                    depth.ping_number,
                    depth.beam_number,
                    depth.xyz.x,
                    depth.xyz.y,
                    depth.xyz.z,
                    depth.validity
                );
            }
            pfm.close()
        }

        Commands::Extent => {
            let mut pfm = Pfm::open(&args.handle, Config::builder().read_only(true).build())?;
            match pfm.coverage_extent()? {
                Some((low, high)) => println!("Data in bins {} - {}", low, high),
                None => println!("No data"),
            }
            pfm.close()
        }

        Commands::Recover => {
            let pfm = Pfm::recover(&args.handle, Config::default())?;
            println!("Recovered {}", args.handle.display());
            pfm.close()
        }
    }
}

fn print_header(pfm: &Pfm) {
    let h = pfm.header();
    println!("{}", h.version);
    println!("  created          {}", h.creation_date);
    println!("  modified         {}", h.last_modified_date);
    println!(
        "  area             ({}, {}) - ({}, {})",
        h.mbr.min_x, h.mbr.min_y, h.mbr.max_x, h.mbr.max_y
    );
    println!("  bins             {} x {}", h.bin_width, h.bin_height);
    println!("  bin size         {} x {}", h.x_bin_size, h.y_bin_size);
    println!("  depth            scale {} offset {} null {}", h.depth_scale, h.depth_offset, h.null_depth);
    println!("  filtered depth   {} - {}", h.min_filtered_depth, h.max_filtered_depth);
    println!("  depth            {} - {}", h.min_depth, h.max_depth);
    println!("  bin count        {} - {}", h.min_bin_count, h.max_bin_count);
    println!("  record length    {}", h.record_length);
    println!(
        "  record sizes     bin {} bytes, depth block {} bytes",
        pfm.geometry().bin.record_size,
        pfm.geometry().depth.record_size
    );
    for (i, file) in pfm.input_files().iter().enumerate() {
        if i == 0 {
            println!("  input files");
        }
        let mark = if file.active { '+' } else { '-' };
        println!("    {} {:5} {}", mark, file.number, file.path);
    }
}

fn load_soundings(pfm: &mut Pfm, input: &PathBuf, file_type: i16, recompute: bool) -> Result<()> {
    let file = File::open(input).map_err(|source| PfmError::Open {
        kind: FileKind::List,
        path: input.clone(),
        source,
    })?;
    let file_number = pfm.add_input_file(&input.display().to_string(), file_type)?;

    let mut touched: Vec<BinCoord> = Vec::new();
    let mut added = 0u64;
    let mut skipped = 0u64;
    for (ping, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let mut fields = line.split_whitespace().map(str::parse::<f64>);
        let (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) = (fields.next(), fields.next(), fields.next()) else {
            skipped += 1;
            continue;
        };

        let record = DepthRecord::new(Coord3::new(x, y, z)).with_ids(file_number, 0, ping as u32, 0);
        match pfm.add_depth(&record) {
            Ok(()) => {
                added += 1;
                if recompute {
                    touched.push(pfm.coord_of(x, y)?);
                }
            }
            Err(PfmError::PositionOutOfArea { .. }) => skipped += 1,
            Err(e) => return Err(e),
        }
    }
    pfm.flush()?;

    if recompute {
        touched.sort_unstable();
        touched.dedup();
        for coord in &touched {
            pfm.recompute_bin(*coord, Some(Validity::PROPAGATED))?;
        }
        pfm.refresh_summary()?;
    }

    println!("Added {} soundings ({} skipped)", added, skipped);
    Ok(())
}
