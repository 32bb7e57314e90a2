use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::info;

use trkfit::config::RunConfig;
use trkfit::finder::TrackFinder;
use trkfit::io::{load_events, save_tracks, EventTracks, TrackFile};
use trkfit::plane_fit::PlaneFitter;
use trkfit::segment::station::SegmentFinder;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    /// Seed, grow and select segments per station
    Segment,
    /// One cluster per plane, exhaustive per station
    Plane,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Events with strip clusters (JSON)
    #[arg(long, value_name = "FILE")]
    input: PathBuf,

    /// Where to write the tracks (JSON)
    #[arg(long, value_name = "FILE")]
    output: PathBuf,

    /// Run configuration; defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Algorithm::Segment)]
    algorithm: Algorithm,

    /// Worker threads, 0 for one per core
    #[arg(long, default_value_t = 0)]
    threads: usize,

    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let run = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if args.threads > 0 {
        ThreadPoolBuilder::new().num_threads(args.threads).build_global()?;
    }

    let geometry = run.layout();
    let finder: Box<dyn TrackFinder + '_> = match args.algorithm {
        Algorithm::Segment => Box::new(SegmentFinder::new(&geometry, run.segment.clone())?),
        Algorithm::Plane => Box::new(PlaneFitter::new(&geometry, run.plane_fit.clone())?),
    };

    let events = load_events(&args.input)?;
    info!(events = events.len(), algorithm = finder.name(), "loaded {}", args.input.display());

    let results: Vec<EventTracks> = events
        .par_iter()
        .map(|e| EventTracks { event_number: e.event_number, tracks: finder.process_event(&e.clusters) })
        .collect();

    let mut file = TrackFile::new(finder.name(), results);
    file.summary = Some(finder.finalize());
    save_tracks(&args.output, &file)?;
    info!("wrote {}", args.output.display());

    Ok(())
}

fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    if verbose {
        subscriber.with_max_level(tracing::Level::DEBUG).init();
    } else {
        subscriber.with_max_level(tracing::Level::INFO).init();
    }
}
