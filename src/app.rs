use crate::cli::Cli;
use anyhow::{Context, Result};
use rtpcast::config::{self, InitOutcome};
use rtpcast::engine::{
    self, Branch, CompiledStream, Coordinator, DeviceMonitor, DeviceSelection, LoopMessage,
    MediaEngine, Platform, Shutdown, StreamConfig, StreamError, StreamOptions, StreamTarget,
    device, materialize_stream,
};
use std::io;
use std::process;
use std::str::FromStr;
use tracing::{Level, info, warn};

pub fn run(cli: Cli) {
    if cli.list {
        handle_list();
        return;
    }

    let result = if cli.init_config {
        handle_init_config(cli.verbose, cli.force)
    } else {
        handle_run(&cli)
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        if let Some(detail) = e
            .downcast_ref::<StreamError>()
            .and_then(StreamError::debug_detail)
        {
            eprintln!("DEBUG: {}", detail);
        }
        process::exit(1);
    }
}

fn init_logging(verbose: u8, configured: &str) {
    let level = match verbose {
        0 => Level::from_str(configured).unwrap_or(Level::WARN),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let installed = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(verbose > 1)
        .try_init();
    if let Err(e) = installed {
        eprintln!("Warning: logging disabled: {}", e);
    }
}

fn handle_list() {
    println!("{}", engine::list_encoders());
    println!();
    println!("{}", engine::list_resolutions());
}

fn handle_init_config(verbose: u8, force: bool) -> Result<()> {
    init_logging(verbose, "warn");
    let path = config::Config::config_path()?;

    match config::Config::init_at(&path, force)? {
        InitOutcome::Existing(cfg) => {
            println!("Config loaded successfully from {}", path.display());
            println!("{:#?}", cfg);
        }
        InitOutcome::Created => println!("Default config saved to {}", path.display()),
        InitOutcome::Replaced => println!("Replaced {} with the default config", path.display()),
    }
    Ok(())
}

fn handle_run(cli: &Cli) -> Result<()> {
    let path = config::Config::config_path()?;
    let config = config::Config::load_or_default(&path)
        .context("Invalid config; run 'rtpcast --init-config' to check it")?;
    init_logging(cli.verbose, &config.output.log_level);

    // Best effort: an unwritable config directory is not fatal
    match config::Config::create_if_missing(&path) {
        Ok(true) => info!(path = %path.display(), "created default config"),
        Ok(false) => {}
        Err(e) => warn!("could not create default config file: {:#}", e),
    }

    handle_stream(cli, &config)
}

fn handle_stream(cli: &Cli, config: &config::Config) -> Result<()> {
    let options = StreamOptions {
        audio_port: cli.audio_port,
        framerate: cli.framerate.unwrap_or(config.stream.framerate),
    };
    let target = StreamTarget::from_args(&cli.args, options)?;
    let platform = match cli.platform {
        Some(platform) => platform,
        None => Platform::detect()?,
    };

    println!("Starting stream with:");
    println!(
        "  Encoder:    {} ({})",
        target.encoder(),
        target.encoder().family()
    );
    println!("  Resolution: {}", target.resolution());
    println!("  Video:      {}:{}", target.host(), target.video_port());
    println!(
        "  Audio:      {}:{} (Opus, 48000Hz, 2ch)",
        target.host(),
        target.audio_port()
    );
    println!("  Platform:   {}", platform);
    println!();

    let stream = if cli.test_sources || cli.dry_run {
        StreamConfig::with_test_sources(target)
    } else {
        let (video, audio) = select_sources()?;
        StreamConfig::new(target, video, audio)
    }
    .with_presentation(config.stream.presentation());

    let compiled = engine::compile(&stream, platform)?;

    if cli.dry_run {
        if cli.json {
            let json =
                serde_json::to_string_pretty(&compiled).context("Failed to serialize pipelines")?;
            println!("{}", json);
        } else {
            print_pipelines(&compiled);
        }
        return Ok(());
    }

    if config.output.print_pipelines {
        print_pipelines(&compiled);
    }

    let shutdown = stream_with_default_engine(&compiled)?;
    match shutdown {
        Shutdown::EndOfStream { branch } => println!("[{}] End of stream", branch),
        Shutdown::Interrupted => println!("Stopped."),
    }
    Ok(())
}

fn print_pipelines(compiled: &CompiledStream) {
    println!("Pipeline commands:");
    println!();
    println!("[Video]");
    println!("{}", compiled.video.launch_command());
    println!();
    println!("[Audio]");
    println!("{}", compiled.audio.launch_command());
    println!();
}

fn select_sources() -> Result<(DeviceSelection, DeviceSelection)> {
    #[cfg(feature = "gstreamer")]
    let monitor = engine::backend::GstEngine::new()?;
    #[cfg(not(feature = "gstreamer"))]
    let monitor = device::ToolDeviceMonitor;

    select_with(&monitor)
}

fn select_with(monitor: &dyn DeviceMonitor) -> Result<(DeviceSelection, DeviceSelection)> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let video = device::select_device(monitor, Branch::Video, &mut input, &mut output)
        .context("Failed to select video device")?;
    println!("Selected video: {}", video.display_name());

    let audio = device::select_device(monitor, Branch::Audio, &mut input, &mut output)
        .context("Failed to select audio device")?;
    println!("Selected audio: {}", audio.display_name());
    println!();

    Ok((video, audio))
}

fn stream_with_default_engine(compiled: &CompiledStream) -> Result<Shutdown, StreamError> {
    #[cfg(feature = "gstreamer")]
    let engine = engine::backend::GstEngine::new().map_err(|source| StreamError::Construction {
        branch: Branch::Video,
        source,
    })?;
    #[cfg(not(feature = "gstreamer"))]
    let engine = engine::LaunchEngine::new();

    stream_with(engine, compiled)
}

fn stream_with<E: MediaEngine>(engine: E, compiled: &CompiledStream) -> Result<Shutdown, StreamError> {
    println!("Building pipelines...");
    let (video, audio) = materialize_stream(&engine, compiled)?;

    let mut coordinator = Coordinator::new(engine, video, audio);
    let interrupt = coordinator.sender();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = interrupt.send(LoopMessage::Interrupted);
    }) {
        warn!("could not install Ctrl-C handler: {}", e);
    }

    println!("Starting pipelines...");
    coordinator.start()?;
    println!("Streaming... Press Ctrl+C to stop.");
    coordinator.run()
}
