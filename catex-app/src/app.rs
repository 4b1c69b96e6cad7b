use ab_glyph::FontVec;
use anyhow::{Context, Result, anyhow};
use catex_core::Frame;
use catex_experiment::{
    Completion, CsvSink, DirectoryCatalog, ExperimentConfig, NullSink, PRESETS, ResultSink,
    Surface, TrialRunner, build_plan, collect_participant, run_session,
};
use catex_timing::HighPrecisionTimer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cli::Cli;
use crate::surface::WindowSurface;

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub struct App {
    cli: Cli,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    pub fn run(self) -> Result<()> {
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "starting"
        );

        let config = load_config(&self.cli)?;
        info!(title = %config.title, persist = config.persist, "configuration loaded");

        // Missing stimuli are fatal before any window opens.
        let catalog =
            DirectoryCatalog::new(config.targets.iter().chain(&config.distractors).cloned());
        let plan = match self.cli.seed {
            Some(seed) => build_plan(&config, &catalog, &mut StdRng::seed_from_u64(seed)),
            None => build_plan(&config, &catalog, &mut rand::rng()),
        }
        .context("building the trial plan")?;
        info!(trials = plan.len(), seed = self.cli.seed, "trial plan built");

        let font = load_font(self.cli.font.as_deref())?;
        let timer = HighPrecisionTimer::new();
        let mut surface = WindowSurface::open(&config.title, self.cli.windowed, font, timer.clone())
            .context("opening the experiment window")?;

        let Some(participant) = collect_participant(&mut surface, config.tick())? else {
            info!("cancelled at participant entry, nothing written");
            surface.close();
            return Ok(());
        };

        let sink: Box<dyn ResultSink> = if config.persist {
            let csv = CsvSink::for_participant(&config, &participant);
            info!(path = %csv.path().display(), "results will be appended");
            Box::new(csv)
        } else {
            Box::new(NullSink)
        };

        let mut runner = TrialRunner::new(config, plan, timer, sink);
        surface.present(&Frame::text(["Loading..."]))?;
        surface
            .preload(&runner.placements())
            .context("loading stimulus images")?;

        let report = run_session(&mut surface, &mut runner)?;

        let stats = &report.stats;
        info!(
            trials = stats.trials,
            correct = stats.correct,
            incorrect = stats.incorrect,
            no_response = stats.no_response,
            accuracy_pct = stats.accuracy_pct(),
            mean_rt_s = stats.mean_reaction_time.map(|d| d.as_secs_f64()),
            segments_saved = report.segments_saved,
            "session summary"
        );
        let frames = surface.frame_stats();
        info!(
            samples = frames.samples,
            avg_ms = frames.average_frame_time_ns / 1e6,
            jitter_ms = frames.jitter_ns / 1e6,
            effective_fps = frames.effective_fps,
            "frame timing"
        );
        if report.completion == Completion::Aborted {
            warn!("session ended early; only completed segments were saved");
        }

        surface.close();
        Ok(())
    }
}

fn load_config(cli: &Cli) -> Result<ExperimentConfig> {
    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ExperimentConfig::preset(&cli.variant).ok_or_else(|| {
            anyhow!(
                "unknown variant `{}` (expected one of: {})",
                cli.variant,
                PRESETS.join(", ")
            )
        })?,
    };
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    Ok(config)
}

fn load_font(explicit: Option<&Path>) -> Result<FontVec> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => FONT_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
            .ok_or_else(|| anyhow!("no system font found; pass --font <ttf>"))?,
    };
    let bytes = std::fs::read(&path).with_context(|| format!("reading font {}", path.display()))?;
    FontVec::try_from_vec(bytes).map_err(|_| anyhow!("{} is not a usable font", path.display()))
}
