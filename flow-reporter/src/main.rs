//! Flow Reporter - recorded flow to markdown report and social image

use flow_reporter::app::cli::{Cli, Commands, ConfigAction};
use flow_reporter::app::config::Config;
use flow_reporter::capability::UnavailableGenerator;
use flow_reporter::flow::{FlowDigest, FlowDocument};
use flow_reporter::workflow::FlowPipeline;
use flow_reporter::ImageGenerator;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    // `init` must work even when the existing file is broken
    if let Commands::Init { force } = cli.command {
        return run_init(force, &config_path);
    }

    let config = if config_path.exists() {
        Config::load(&config_path)?
    } else if cli.config.is_some() {
        anyhow::bail!("Config file not found: {:?}", config_path);
    } else {
        Config::default()
    };

    match cli.command {
        Commands::Generate {
            input,
            output,
            no_cache,
            skip_image,
        } => {
            run_generate(&input, output, no_cache, skip_image, &config)?;
        }
        Commands::Inspect { path } => {
            run_inspect(&path)?;
        }
        Commands::Config { action } => {
            run_config(action, &config, &config_path)?;
        }
        Commands::Init { .. } => {}
    }

    Ok(())
}

fn run_generate(
    input: &Path,
    output: Option<PathBuf>,
    no_cache: bool,
    skip_image: bool,
    config: &Config,
) -> anyhow::Result<()> {
    info!("Generating report from {:?}", input);

    if !input.exists() {
        anyhow::bail!("Flow file not found: {:?}", input);
    }

    let mut pipeline_config = config.pipeline_config();
    if let Some(dir) = output {
        pipeline_config.output_dir = dir;
    }
    if no_cache {
        pipeline_config.cache_enabled = false;
    }
    pipeline_config.skip_image = skip_image;

    let image: Box<dyn ImageGenerator> = if skip_image {
        Box::new(UnavailableGenerator::new(&config.image.model, "image generation disabled"))
    } else {
        config.image_binding()
    };
    let pipeline = FlowPipeline::new(pipeline_config, config.text_binding(), image);

    let outcome = match pipeline.run(input) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Failed to generate report: {}", e);
            anyhow::bail!("Report generation failed: {}", e);
        }
    };

    println!("\nReport Generated!");
    println!("  Title: {}", outcome.summary.title);
    println!("  Steps: {}", outcome.summary.step_descriptions.len());
    if !outcome.warnings.is_empty() {
        println!("  Step warnings: {}", outcome.warnings.len());
    }
    println!("  Report: {:?}", outcome.report_path);
    match (&outcome.image_path, &outcome.image_error) {
        (Some(path), _) => println!("  Image: {:?}", path),
        (None, Some(e)) => {
            error!("Image generation failed: {}", e);
            anyhow::bail!("Report written without image: {}", e);
        }
        (None, None) => println!("  Image: skipped"),
    }

    Ok(())
}

fn run_inspect(path: &Path) -> anyhow::Result<()> {
    let flow = FlowDocument::load(path)?;
    let digest = FlowDigest::build(&flow);
    println!("{}", digest.to_json()?);
    Ok(())
}

fn run_init(force: bool, config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {:?}. Use --force to overwrite.",
            config_path
        );
    }

    let config = Config::default();
    config.save(config_path)?;
    println!("Created config at {:?}", config_path);
    println!("\nConfig content:\n{}", config.to_toml()?);

    std::fs::create_dir_all(config.cache_dir())?;
    println!("\nCache directory: {:?}", config.cache_dir());
    println!("Set ANTHROPIC_API_KEY and GEMINI_API_KEY before running `generate`.");

    Ok(())
}

fn run_config(action: ConfigAction, config: &Config, config_path: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("Configuration ({:?}):\n", config_path);
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }
    Ok(())
}
