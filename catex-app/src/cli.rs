use clap::Parser;
use std::path::PathBuf;

/// Timed image categorisation experiments
#[derive(Parser, Debug)]
#[command(name = "catex")]
#[command(about = "Run an emotion or flanker categorisation session")]
#[command(version)]
pub struct Cli {
    /// Built-in configuration: emotion, emotion-practice, flanker, flanker-practice
    #[arg(short, long, default_value = "emotion")]
    pub variant: String,

    /// JSON configuration file (overrides --variant)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// TrueType font for on-screen text. Common system fonts are tried when
    /// omitted.
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Directory for result files (overrides the configuration)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Seed for the trial plan, for reproducible orderings
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run in a window instead of borderless fullscreen
    #[arg(long)]
    pub windowed: bool,
}
