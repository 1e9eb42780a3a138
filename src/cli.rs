use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Default, Parser)]
#[command(name = "kestrel")]
#[command(version = "0.1.0")]
#[command(about = "A modal text editing engine driven by vim keystrokes")]
pub struct CliArgs {
    /// Files to open, one buffer each; the last one is active
    pub files: Vec<PathBuf>,

    /// Keystrokes to replay, in vim notation (e.g. "3dd:w<CR>")
    #[arg(long, short = 'k')]
    pub keys: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Print the active buffer to stdout after replaying keys
    #[arg(long, short = 'p')]
    pub print: bool,
}

impl CliArgs {
    /// Paths that exist but are not regular files
    pub fn directories(&self) -> Vec<&PathBuf> {
        self.files
            .iter()
            .filter(|path| std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false))
            .collect()
    }
}

pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
