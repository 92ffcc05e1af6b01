use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use subtitle_client::cli::{self, build_cli};
use subtitle_client::{create_backend, Config, PipelineController};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let verbose = matches.get_flag("verbose");

    // Load configuration
    let (mut config, load_error) = match matches.get_one::<String>("config") {
        Some(path) => (
            Config::load_from(Path::new(path)).with_context(|| format!("Failed to load config {}", path))?,
            None,
        ),
        None => match Config::load() {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
    };

    // Initialize logging
    let level = if verbose { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("subtitle_client={},warn", level)));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if let Some(e) = load_error {
        warn!("Failed to load config, using defaults: {}", e);
    }

    if let Some(url) = matches.get_one::<String>("backend") {
        config.backend.base_url = url.clone();
    }
    if let Some(dir) = matches.get_one::<String>("download-dir") {
        config.output.download_dir = PathBuf::from(dir);
    }
    config.validate()?;

    info!("🚀 Subtitle client starting...");
    info!("🔧 {}", config.summary());

    match matches.subcommand() {
        Some(("languages", _)) => println!("{}", cli::language_list()),
        Some(("formats", _)) => println!("{}", cli::format_list()),
        Some(("generate", sub)) => {
            let files: Vec<PathBuf> = sub
                .get_many::<String>("files")
                .map(|values| values.map(PathBuf::from).collect())
                .unwrap_or_default();

            let mut controller = PipelineController::new(create_backend(&config.backend)?, &config);
            if let Some(code) = sub.get_one::<String>("language") {
                controller.set_target_language(code.parse()?);
            }
            if let Some(code) = sub.get_one::<String>("format") {
                controller.set_output_format(code.parse()?);
            }
            if sub.get_flag("translate") {
                controller.set_translate(true);
            }

            let selected = controller.select_path(&files).await.map(|_| ());
            cli::print_notifications(controller.take_notifications());
            selected?;

            let reporter = cli::spawn_progress_reporter(controller.subscribe());
            let outcome = controller.run_generate().await;
            reporter.abort();
            cli::print_notifications(controller.take_notifications());

            match outcome {
                Ok(outcome) => {
                    print!("{}", controller.render_transcript());
                    println!("Subtitles written to {}", outcome.downloaded_to.display());
                }
                Err(e) => bail!(e),
            }
        }
        Some(("shell", sub)) => {
            let mut controller = PipelineController::new(create_backend(&config.backend)?, &config);
            if let Some(file) = sub.get_one::<String>("file") {
                let _ = controller.select_path(&[PathBuf::from(file)]).await;
                cli::print_notifications(controller.take_notifications());
            }
            cli::run_shell(&mut controller).await?;
        }
        _ => {
            let mut controller = PipelineController::new(create_backend(&config.backend)?, &config);
            cli::run_shell(&mut controller).await?;
        }
    }

    Ok(())
}
