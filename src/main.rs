use std::path::PathBuf;

use anyhow::Context;
use argh::FromArgs;
use indicatif::{ProgressBar, ProgressStyle};
use rand::prelude::*;

use nodefield::{
    CommandDump, FieldParameters, FrameSink, NodeField, PngSink, RasterSurface, ResizeEvent,
    Runner,
};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;
const FRAMES: usize = 600;
const BATCH: usize = 32;

/// Render the drifting node field to numbered PNG frames.
#[derive(FromArgs)]
struct Args {
    /// JSON file with field parameters
    #[argh(option)]
    config: Option<PathBuf>,

    /// surface width in pixels
    #[argh(option, default = "WIDTH")]
    width: u32,

    /// surface height in pixels
    #[argh(option, default = "HEIGHT")]
    height: u32,

    /// number of frames to render
    #[argh(option, default = "FRAMES")]
    frames: usize,

    /// seed for the initial layout; random when omitted
    #[argh(option)]
    seed: Option<u64>,

    /// directory the frames are written to
    #[argh(option, default = "PathBuf::from(\"./frames\")")]
    output: PathBuf,

    /// resize before a frame, as FRAME:WIDTHxHEIGHT (repeatable)
    #[argh(option)]
    resize: Vec<ResizeEvent>,

    /// also write each frame's draw commands as JSON lines to this file
    #[argh(option)]
    dump_commands: Option<PathBuf>,

    /// frames encoded together in parallel
    #[argh(option, default = "BATCH")]
    batch: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args: Args = argh::from_env();

    let params = match &args.config {
        Some(path) => FieldParameters::from_json_file(path)
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        None => FieldParameters::default(),
    };
    let background = params.background()?;

    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    log::info!("rendering {} frames with seed {}", args.frames, seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let field = NodeField::new(args.width, args.height, &params, &mut rng)
        .context("building node field")?;
    let surface = RasterSurface::new(args.width, args.height, background);
    let mut runner = Runner::new(field, surface, args.resize);

    let mut sink = PngSink::new(&args.output, args.batch)
        .with_context(|| format!("preparing {}", args.output.display()))?;
    let mut dump = match &args.dump_commands {
        Some(path) => Some(CommandDump::create(path)?),
        None => None,
    };

    let pbar = ProgressBar::new(args.frames as u64);
    pbar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}/{eta_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
        )?,
    );

    for index in 0..args.frames {
        let frame = runner.tick();
        if let Some(dump) = dump.as_mut() {
            dump.record(index, &frame)?;
        }
        pbar.set_message(format!("{} links", frame.lines()));
        sink.accept(index, runner.surface().image().clone())?;
        pbar.inc(1);
    }
    sink.finish()?;
    if let Some(dump) = dump {
        dump.finish()?;
    }
    pbar.finish_with_message("done");
    Ok(())
}
