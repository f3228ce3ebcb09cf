use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::anyhow;
use tracing::info;

mod caption;
mod config;
mod error;
mod llm;
mod utils;

use caption::{load_material_rules, Describer, Pipeline, Recaptioner};
use config::{Config, DEFAULT_ENV_FILE};
use llm::types::ChatCompletionService;
use llm::{GroqClient, ImagePayload};
use utils::logging::init_logging;

const DEFAULT_IMAGE_PATH: &str = "assets/selfie_guy.png";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    /// Describe and recaption separately, printing both stages.
    Reference,
    /// Full pipeline, printing only the final caption.
    Caption,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RunArgs {
    mode: Mode,
    image_path: PathBuf,
    seed: Option<i64>,
}

fn usage() -> &'static str {
    "Usage: recaption [caption] [--image <path>] [--seed <i64>]"
}

fn parse_args(args: &[String]) -> anyhow::Result<RunArgs> {
    let mut index = 1;
    let mode = if args.get(1).map(|value| value.as_str()) == Some("caption") {
        index += 1;
        Mode::Caption
    } else {
        Mode::Reference
    };

    let mut image_path = PathBuf::from(DEFAULT_IMAGE_PATH);
    let mut seed = None;

    while index < args.len() {
        match args[index].as_str() {
            "--image" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --image"))?;
                image_path = PathBuf::from(value);
            }
            "--seed" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --seed"))?;
                seed = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| anyhow!("Invalid --seed value: {value}"))?,
                );
            }
            "--help" | "-h" => {
                return Err(anyhow!(usage()));
            }
            other => {
                return Err(anyhow!("Unknown argument: {other}\n{}", usage()));
            }
        }
        index += 1;
    }

    Ok(RunArgs {
        mode,
        image_path,
        seed,
    })
}

/// Both stages run with the same seed, 0 unless one was given.
async fn reference_report(
    config: &Config,
    service: &dyn ChatCompletionService,
    args: &RunArgs,
) -> anyhow::Result<String> {
    let seed = args.seed.unwrap_or(0);
    let image = ImagePayload::load(&args.image_path)?;
    let mut report = String::new();

    let description = Describer::new(&config.describe_model)
        .describe(service, &image, seed)
        .await?;
    writeln!(report, "INITIAL DESCRIPTION")?;
    writeln!(report, "{description}")?;

    let rules = load_material_rules(&config.rules_path)?;
    let result = Recaptioner::new(&config.recaption_model)
        .recaption(service, &description, &rules, seed)
        .await?;
    writeln!(report, "\n\n\nRE-WRITTEN DESCRIPTION")?;
    writeln!(report, "{result}")?;

    writeln!(report, "\n\n\nDONE.")?;
    Ok(report)
}

async fn run_reference(
    config: &Config,
    service: &dyn ChatCompletionService,
    args: &RunArgs,
) -> anyhow::Result<()> {
    print!("{}", reference_report(config, service, args).await?);
    Ok(())
}

async fn run_caption(
    config: &Config,
    service: &dyn ChatCompletionService,
    args: &RunArgs,
) -> anyhow::Result<()> {
    let image = ImagePayload::load(&args.image_path)?;
    let caption = Pipeline::from_config(config)
        .write_caption(service, &image, args.seed)
        .await?;
    println!("{caption}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let run_args = parse_args(&args)?;

    let config = Config::load(DEFAULT_ENV_FILE)?;
    let _guards = init_logging(&config.log_level);
    let client = GroqClient::from_config(&config)?;

    info!(
        "Starting recaption mode={:?} image={}",
        run_args.mode,
        run_args.image_path.display()
    );

    match run_args.mode {
        Mode::Reference => run_reference(&config, &client, &run_args).await,
        Mode::Caption => run_caption(&config, &client, &run_args).await,
    }
}
