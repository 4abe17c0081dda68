//! Oxidized-RR - headless script runner
//!
//! Runs a Lua script against the headless machine for a fixed number of
//! frames.
//!
//! Usage: `oxidized-rr [script.lua] [frames]`. Without a script argument
//! the last script run is used again.

mod headless;

use anyhow::{Context, Result};
use headless::HeadlessHost;
use rr_core::{logging, Config, MachineControl};
use rr_engine::Engine;
use rr_overlay::{FrameBuffer, PixelFormat};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

/// Frames run when no count is given
const DEFAULT_FRAMES: u64 = 600;

const SCREEN_WIDTH: u32 = 320;
const SCREEN_HEIGHT: u32 = 240;

fn main() -> Result<()> {
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Could not load config ({}), using defaults", e);
        Config::default()
    });
    logging::init(config.debug.log_level);

    let mut args = std::env::args().skip(1);
    let script = match args.next() {
        Some(path) => PathBuf::from(path),
        None => config
            .general
            .last_script
            .clone()
            .context("usage: oxidized-rr <script.lua> [frames]")?,
    };
    let frames = args
        .next()
        .map(|n| n.parse::<u64>())
        .transpose()
        .context("frame count must be a number")?
        .unwrap_or(DEFAULT_FRAMES);

    tracing::info!("Starting Oxidized-RR headless runner");

    let host = Rc::new(RefCell::new(HeadlessHost::new()));
    let mut engine = Engine::new(host.clone(), config.clone());
    engine.set_screen_size(SCREEN_WIDTH, SCREEN_HEIGHT);
    engine
        .load(&script)
        .with_context(|| format!("could not start {}", script.display()))?;

    config.general.last_script = Some(script);
    if let Err(e) = config.save() {
        tracing::warn!("Could not save config: {}", e);
    }

    let mut screen = FrameBuffer::new(PixelFormat::Rgb32, SCREEN_WIDTH, SCREEN_HEIGHT);
    let mut overlay_frames = 0u64;
    let mut forced_inputs = 0usize;

    for _ in 0..frames {
        engine.on_before_emulation();
        forced_inputs += engine.apply_joypad_overrides();

        let paused = host.borrow().is_paused();
        if !paused {
            host.borrow_mut().run_frame();
            engine.on_memory_write();
        }

        engine.on_after_emulation();
        engine.on_frame_boundary();
        if engine.on_render_overlay(&mut screen) {
            overlay_frames += 1;
        }
        host.borrow_mut().end_frame();

        if !engine.is_running() {
            break;
        }
    }

    let host_frames = host.borrow().frame_number();
    tracing::info!(
        "Ran {} frames ({} with overlay, {} forced inputs), speed mode {}, fast forward {}",
        host_frames,
        overlay_frames,
        forced_inputs,
        engine.speed_mode(),
        host.borrow().is_fast_forward()
    );

    engine.stop();
    Ok(())
}
