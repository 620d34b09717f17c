// Watershed - simulated pond art installation driving an RGB matrix and an
// addressable LED strip, with arcade switches injecting droplets that settle
// into a sediment bed and move the pond's health.
use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

mod assets;
mod canvas;
mod config;
mod hw;
mod mobs;
mod mud;
mod pond;
mod strip;
mod switches;
mod types;

use assets::AssetManager;
use config::{Args, Config};
use hw::{ConsoleMatrix, ConsoleSwitches, DeviceStrip, FrameSink, NullStrip, StripOutput, SwitchInput};
use pond::Pond;
use switches::Switches;
use types::{Rgb, TransientError};

fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = Config::load(args.cfg.as_ref())?;
    if let Some(fps) = args.fps {
        config.fps = fps;
    }

    let mut assets = AssetManager::new(args.assets.clone());
    let mut switches = Switches::new(config.switches.pins, config.switches.throttle);
    let mut strip_out: Box<dyn StripOutput> = match &args.strip_dev {
        Some(path) => Box::new(DeviceStrip::open(path)?),
        None => Box::new(NullStrip),
    };

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    let frame_duration = Duration::from_secs_f64(1.0 / config.fps);
    let pins = config.switches.pins;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let started = Instant::now();
    let mut pond = Pond::new(config, &mut assets, 0.0)?;

    // raw mode last, so earlier failures report on a normal terminal
    let mut input = ConsoleSwitches::new();
    let mut matrix = ConsoleMatrix::new()?;
    info!("running at {} fps, q to quit", pond.config.fps);

    // the most recent recoverable failure; shown as one indicator pixel
    // until a frame completes cleanly
    let mut last_error: Option<TransientError> = None;

    while running.load(Ordering::SeqCst) && !input.quit_requested() {
        let frame_start = Instant::now();
        let t = started.elapsed().as_secs_f64();
        let mut failed = false;

        let actions = match input.read_pins(pins) {
            Ok(states) => switches.poll(&states, t),
            Err(err) => {
                warn!("switch read failed: {err:#}");
                last_error = Some(TransientError::new(
                    format!("switch read failed: {err:#}"),
                    Rgb::new(0xff, 0x66, 0),
                ));
                failed = true;
                Vec::new()
            }
        };

        pond.tick(t, &actions, &mut switches, &mut rng);
        if let Some(err) = &last_error {
            pond.canvas.put_pixel(0, 0, err.color);
        }

        matrix.present(&pond.canvas)?;
        if let Err(err) = strip_out.write_frame(pond.strip.buffer()) {
            warn!("strip write failed: {err:#}");
            last_error = Some(TransientError::new(
                format!("strip write failed: {err:#}"),
                Rgb::new(0xff, 0, 0),
            ));
            failed = true;
        }
        if !failed {
            last_error = None;
        }

        let elapsed = frame_start.elapsed();
        if elapsed < frame_duration {
            thread::sleep(frame_duration - elapsed);
        }
    }

    // blank the strip on the way out; the matrix restores with the terminal
    pond.strip.clear();
    strip_out.write_frame(pond.strip.buffer()).ok();
    info!("stopped");
    Ok(())
}
