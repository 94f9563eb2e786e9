use std::io::BufRead;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use crossbeam_channel::{Receiver, RecvTimeoutError};

use backdrop::command::{self, Directive};
use backdrop::listing::DirListing;
use backdrop::settings::Settings;
use backdrop::sink::LogSink;
use backdrop::video::probe::ProbeBackend;
use backdrop::{AssetCatalog, KeyNormalizer, PlaybackController, PlaybackState};

/// How long to keep ticking after stdin closes so in-flight prepares land.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct Args {
    settings: Option<PathBuf>,
    media_dir: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => {
                parsed.settings = Some(args.next().context("--settings needs a path")?.into());
            }
            "--media" => {
                parsed.media_dir = Some(args.next().context("--media needs a directory")?.into());
            }
            "-h" | "--help" => {
                println!("usage: backdrop [--settings <file>] [--media <dir>] < directives");
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(parsed)
}

/// Read stdin lines on a helper thread so the frame loop keeps ticking.
fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = crossbeam_channel::bounded(64);
    std::thread::Builder::new()
        .name("backdrop-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn stdin reader")?;
    Ok(rx)
}

fn run_frames(controller: &mut PlaybackController<LogSink>, duration: Duration, frame: Duration) {
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        controller.poll();
        std::thread::sleep(frame);
    }
    controller.poll();
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let mut settings = match &args.settings {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load(),
    };
    if let Some(dir) = args.media_dir {
        settings.media_dir = dir;
    }

    let normalizer = KeyNormalizer::new(&settings.key_prefix);
    let catalog = match AssetCatalog::from_listing(&DirListing::new(&settings.media_dir), &normalizer)
    {
        Ok(catalog) => catalog,
        Err(e) => {
            log::warn!("Starting with an empty background catalog: {e:#}");
            AssetCatalog::new(&normalizer)
        }
    }
    .with_video_dir(&settings.media_dir, &settings.video_extension);

    let backend = ProbeBackend::spawn()?;
    let mut controller = PlaybackController::new(
        normalizer,
        catalog,
        Box::new(backend),
        LogSink,
        settings.controller_options(),
    );

    let frame = Duration::from_millis(settings.frame_interval_ms.max(1));
    let lines = spawn_stdin_reader()?;
    log::info!("Backdrop ready; reading directives from stdin");

    loop {
        match lines.recv_timeout(frame) {
            Ok(line) => match command::parse_line(&line) {
                Some(Directive::Background(raw)) => controller.request(&raw),
                Some(Directive::Wait(ms)) => {
                    run_frames(&mut controller, Duration::from_millis(ms), frame);
                }
                Some(Directive::Status) => log::info!("{:?}", controller.info()),
                Some(Directive::Quit) => break,
                None => {}
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        controller.poll();
    }

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    while matches!(controller.state(), PlaybackState::Preparing { .. }) && Instant::now() < deadline
    {
        controller.poll();
        std::thread::sleep(frame);
    }

    log::info!("Final background: {:?}", controller.info());
    controller.shutdown();
    Ok(())
}
