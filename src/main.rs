use anyhow::{Context, bail};
use kestrel::cli;
use kestrel::config::EditorConfig;
use kestrel::editor::{Editor, Status};
use log::{info, warn};

/// Headless driver: open the given files, replay keystrokes against them and
/// optionally print the active buffer.
fn main() -> anyhow::Result<()> {
    let args = cli::parse_args();

    let config = match &args.config {
        Some(path) => EditorConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EditorConfig::load_default().context("loading default config")?,
    };

    // RUST_LOG wins over the configured level
    let level = config.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Some(dir) = args.directories().first() {
        bail!("{} is a directory", dir.display());
    }

    let mut editor = Editor::with_config(config);
    for path in &args.files {
        if let Err(e) = editor.open_file(path) {
            warn!("{}", e);
        }
    }

    if let Some(keys) = &args.keys {
        let quit = editor
            .feed_keys(keys)
            .context("replaying keys")?;
        if quit {
            info!("quit requested");
        }
    }

    match editor.status() {
        Some(Status::Error(msg)) => eprintln!("{}", msg),
        Some(Status::Info(msg)) => info!("{}", msg),
        None => {}
    }

    if args.print {
        print!("{}", editor.buffer().text());
    }
    Ok(())
}
