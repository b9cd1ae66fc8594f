use anyhow::{Context, Result};
use clap::Parser;
use screenshot::config::{self, UserDefaults};
use screenshot::constants::limits::MAX_DELAY_SECONDS;
use screenshot::{CaptureController, CaptureEvent, PrimaryScreen, alert, build_output_path, parse_format};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "screenshot")]
#[command(about = "Capture the primary display and save it to an image file", long_about = None)]
struct Args {
    #[arg(long, help = "Launch GUI mode")]
    gui: bool,

    #[arg(short, long, help = "Output file (default: timestamped name in the save directory)")]
    output: Option<PathBuf>,

    #[arg(
        short,
        long,
        help = "Output format when the output has no extension: png, jpg, jpeg, gif, bmp, tiff, tif, webp, ico, tga, pnm, qoi"
    )]
    format: Option<String>,

    #[arg(
        short,
        long,
        value_parser = clap::value_parser!(u32).range(0..=MAX_DELAY_SECONDS as i64),
        help = "Delay in seconds before capturing (0-60)"
    )]
    delay: Option<u32>,

    #[arg(long, help = "Hide the GUI window while capturing (stored with --save-defaults)")]
    hide_window: bool,

    #[arg(long, help = "Default save directory (stored with --save-defaults)")]
    dir: Option<PathBuf>,

    #[arg(long, help = "Print the stored defaults")]
    show_defaults: bool,

    #[arg(long, help = "Store --delay, --format, --hide-window and --dir as defaults")]
    save_defaults: bool,
}

fn show_defaults(user_defaults: &UserDefaults) -> Result<()> {
    println!("\nSCREENSHOT DEFAULTS");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Delay: {} s", user_defaults.delay_seconds);
    println!("  Hide window: {}", user_defaults.hide_window);
    println!("  Format: {}", user_defaults.format);
    println!("  Save directory: {}", user_defaults.save_directory().display());

    let defaults_file = config::get_defaults_file_path()?;
    println!("\nDefaults file: {}", defaults_file.display());
    if !defaults_file.exists() {
        println!("   Save defaults with: --save-defaults --delay 3 --format jpg");
    }
    println!();

    Ok(())
}

fn save_defaults(args: &Args, mut user_defaults: UserDefaults) -> Result<()> {
    if let Some(delay) = args.delay {
        user_defaults.delay_seconds = delay;
    }
    if let Some(format) = &args.format {
        parse_format(format)?;
        user_defaults.format = format.to_lowercase();
    }
    if let Some(dir) = &args.dir {
        user_defaults.save_directory = Some(dir.clone());
    }
    user_defaults.hide_window = args.hide_window;

    // Reject combinations the controller would refuse
    screenshot::CaptureSettings::new(user_defaults.delay_seconds, user_defaults.hide_window)?;

    config::save_defaults(&user_defaults)?;
    println!("Defaults saved to {}", config::get_defaults_file_path()?.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Launch GUI mode if requested
    if args.gui {
        screenshot::gui::run_gui().map_err(|e| anyhow::anyhow!("GUI error: {:?}", e))?;
        return Ok(());
    }

    let user_defaults = config::load_defaults()?;

    if args.show_defaults {
        return show_defaults(&user_defaults);
    }

    if args.save_defaults {
        return save_defaults(&args, user_defaults);
    }

    // Validate format before starting capture
    let format = args.format.clone().unwrap_or_else(|| user_defaults.format.clone());
    parse_format(&format)?;

    let delay = args.delay.unwrap_or(user_defaults.delay_seconds);
    let directory = args
        .dir
        .clone()
        .unwrap_or_else(|| user_defaults.save_directory());
    let output_path = build_output_path(args.output.as_deref(), &directory, &format);

    let observer = |event: &CaptureEvent| match event {
        CaptureEvent::PlayAlert => alert::ring_bell(),
        CaptureEvent::CaptureFinished(image) => {
            println!("Captured screen ({}x{})", image.width(), image.height());
        }
        CaptureEvent::HideWindow | CaptureEvent::ShowWindow => {}
    };

    let mut settings = user_defaults.capture_settings();
    settings.set_delay(0)?;
    let mut controller = CaptureController::new(PrimaryScreen, observer, settings)
        .context("Failed to capture the primary display")?;

    if delay > 0 {
        controller.set_delay(delay)?;
        println!("Capturing in {} seconds...", delay);
        let due = controller.schedule_capture(Instant::now())?;
        thread::sleep(due.saturating_duration_since(Instant::now()));
        controller.tick(Instant::now())?;
    } else {
        let image = controller.image();
        println!("Captured screen ({}x{})", image.width(), image.height());
    }

    let written = controller.save_with_default(&output_path, &format)?;
    println!("Saved to {}", written.display());

    Ok(())
}
