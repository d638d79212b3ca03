//! Headless driver: runs one generation batch against the in-memory engine.

use clap::Parser;
use kurbo::Point;
use promptcanvas_core::{
    AspectRatio, GenerationRequest, MAX_BATCH_COUNT, MemoryEngine, Studio, StudioConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Run a PromptCanvas generation batch without a UI.
#[derive(Parser, Debug)]
#[command(
    name = "promptcanvas",
    about = "PromptCanvas headless generation driver",
    long_about = "Submit one generation request to an in-memory canvas, tick it to\n\
                  completion and print the resulting layers.\n\n\
                  Example:\n  \
                  promptcanvas --ratio 16:9 --count 4 a lighthouse at dusk"
)]
struct Cli {
    /// JSON configuration file. Missing fields keep their defaults.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Model id from the configured catalog.
    #[arg(short, long, default_value = "image-standard")]
    model: String,

    /// Aspect ratio: 1:1, 16:9, 9:16, 4:3, 3:4 or keep. Unknown ratios fall back to 1:1.
    #[arg(short, long, default_value = "1:1", value_parser = parse_ratio, value_name = "W:H")]
    ratio: AspectRatio,

    /// Number of elements in the batch.
    #[arg(
        short = 'n',
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_BATCH_COUNT))
    )]
    count: u32,

    /// Prompt text.
    #[arg(value_name = "PROMPT")]
    prompt: Vec<String>,
}

impl Cli {
    fn prompt_text(&self) -> String {
        if self.prompt.is_empty() {
            "a lighthouse at dusk".to_string()
        } else {
            self.prompt.join(" ")
        }
    }
}

fn parse_ratio(token: &str) -> Result<AspectRatio, String> {
    Ok(AspectRatio::parse(token))
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Starting PromptCanvas");

    let cli = Cli::parse();
    let prompt = cli.prompt_text();

    let config = match &cli.config {
        Some(path) => match StudioConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("Failed to load config {}: {}", path.display(), err);
                return ExitCode::FAILURE;
            }
        },
        None => StudioConfig::default(),
    };

    let mut engine = MemoryEngine::new();
    engine.center_on(Point::ZERO);

    let kind = match config.models.get(&cli.model) {
        Ok(model) => model.kind,
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    let tick_interval = config.tick_interval();
    let mut studio = Studio::new(engine, config);

    studio.on_task_progress(|task_id, _, progress| {
        log::info!("Task {}: {}%", task_id, progress);
    });
    studio.on_batch_completed(|request, ids| {
        log::info!("Batch for \"{}\" resolved {} element(s)", request.prompt, ids.len());
    });
    studio.on_batch_failed(|request, _, reason| {
        log::error!("Batch for \"{}\" failed: {}", request.prompt, reason);
    });

    let request = GenerationRequest::new(kind, cli.model, prompt)
        .with_aspect_ratio(cli.ratio)
        .with_count(cli.count);
    if let Err(err) = studio.submit_generation(request) {
        log::error!("Generation rejected: {}", err);
        return ExitCode::FAILURE;
    }

    while studio.has_live_tasks() {
        std::thread::sleep(tick_interval);
        studio.tick();
    }

    for layer in studio.layers() {
        let config = layer
            .generation_config
            .as_ref()
            .and_then(|request| serde_json::to_string(request).ok())
            .unwrap_or_default();
        println!(
            "{}\t{}\t{}x{} at ({}, {})\t{}\t{}",
            layer.id,
            layer.name,
            layer.size.width,
            layer.size.height,
            layer.position.x,
            layer.position.y,
            layer.url,
            config
        );
    }

    ExitCode::SUCCESS
}
