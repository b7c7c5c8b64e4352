use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use superspoty::app::{self, AppStartupOptions};
use superspoty::{config, logging};

#[derive(Parser, Debug)]
#[command(name = "superspoty")]
#[command(about = "Terminal music player with shuffle and repeat", long_about = None)]
struct Args {
    /// Folder to load as the track list on startup
    music_dir: Option<PathBuf>,

    /// Directory holding settings, playlists and the log file
    #[arg(long, env = config::CONFIG_DIR_ENV)]
    config_dir: Option<PathBuf>,

    /// Run without opening an audio device
    #[arg(long)]
    null_audio: bool,

    /// Use file names as titles instead of reading tags
    #[arg(long)]
    no_tags: bool,

    /// Verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_root = match args.config_dir {
        Some(dir) => dir,
        None => config::config_root()?,
    };
    let log_path = logging::init(&config_root, args.verbose)?;
    log::info!(
        "starting superspoty {} (log: {})",
        env!("CARGO_PKG_VERSION"),
        log_path.display()
    );

    let result = app::run_with_startup(AppStartupOptions {
        config_root,
        music_dir: args.music_dir,
        null_audio: args.null_audio,
        skip_tags: args.no_tags,
    });
    if let Err(err) = &result {
        log::error!("exiting with error: {err:#}");
    }
    result
}
