// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use mdtranslate::app_config::{self, Config};
use mdtranslate::app_controller::Controller;
use mdtranslate::database::{DatabaseConnection, Repository};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a Markdown file or every Markdown file in a directory (default command)
    Translate(TranslateArgs),

    /// Inspect or empty the translation cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,

        /// Configuration file path
        #[arg(short, long, default_value = "conf.json")]
        config_path: String,
    },

    /// Generate shell completions for mdtranslate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum CacheAction {
    /// Show entry count, hits and size
    Stats,
    /// Delete every cached translation
    Clear,
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input Markdown file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    #[command(flatten)]
    options: TranslateOptions,
}

#[derive(clap::Args, Debug, Clone)]
struct TranslateOptions {
    /// Directory for translated files (defaults to next to each input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature (0.0 to 2.0)
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Target language code (e.g., 'zh', 'fr', 'deu')
    #[arg(short = 'l', long)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// mdtranslate - Markdown translation with AI
///
/// Translates long Markdown documents chunk by chunk while keeping code,
/// links, images, tables, formulas and HTML untouched.
#[derive(Parser, Debug)]
#[command(name = "mdtranslate")]
#[command(version)]
#[command(about = "AI-powered Markdown translation tool")]
#[command(long_about = "mdtranslate translates Markdown documents with an OpenAI-compatible chat model.

EXAMPLES:
    mdtranslate README.md                        # Translate using default config
    mdtranslate -f README.md                     # Force overwrite existing files
    mdtranslate -m gpt-4o -l fr README.md        # Use a specific model and target language
    mdtranslate -o out/ docs/                    # Process an entire directory
    mdtranslate --log-level debug docs/          # Verbose logging
    mdtranslate cache stats                      # Show translation cache statistics
    mdtranslate completions bash > mdtranslate.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. The API key can also come from OPENAI_API_KEY.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input Markdown file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    #[command(flatten)]
    options: TranslateOptions,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "31",
            Level::Warn => "33",
            Level::Info => "32",
            Level::Debug => "36",
            Level::Trace => "35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[1;{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The level is lowered or raised once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "mdtranslate", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Cache { action, config_path }) => run_cache(action, &config_path).await,
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => {
            // Default behavior - use top-level args
            let input_path = cli
                .input_path
                .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

            run_translate(TranslateArgs {
                input_path,
                options: cli.options,
            })
            .await
        }
    }
}

fn load_config(config_path: &str) -> Result<Config> {
    let (config, created) = Config::load_or_create(Path::new(config_path))?;
    if created {
        warn!("Config file not found at '{}', created default config.", config_path);
    }
    Ok(config)
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let options = args.options;

    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = load_config(&options.config_path)?;

    // Override config with CLI options if provided
    if let Some(model) = &options.model {
        config.translation.provider.model = model.clone();
    }
    if let Some(temperature) = options.temperature {
        config.translation.common.temperature = temperature;
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let controller = Controller::with_config(config)?;
    let input_path = args.input_path;

    if input_path.is_file() {
        let output_dir = match &options.output_dir {
            Some(dir) => dir.clone(),
            None => input_path.parent().unwrap_or(Path::new(".")).to_path_buf(),
        };
        controller
            .run(input_path.clone(), output_dir, options.force_overwrite)
            .await?;
    } else if input_path.is_dir() {
        let summary = controller
            .run_folder(input_path.clone(), options.output_dir.clone(), options.force_overwrite)
            .await?;
        if summary.errors > 0 {
            return Err(anyhow!("{} file(s) could not be translated", summary.errors));
        }
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", input_path));
    }

    Ok(())
}

async fn run_cache(action: CacheAction, config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    log::set_max_level(config.log_level.to_level_filter());

    let connection = match &config.cache.path {
        Some(path) => DatabaseConnection::new(path)?,
        None => DatabaseConnection::new_default()?,
    };
    let repository = Repository::new(connection);

    match action {
        CacheAction::Stats => {
            let stats = repository.get_cache_stats(config.cache.ttl_days).await?;
            info!("{:?}", repository.connection().path());
            println!("{}", stats);
        }
        CacheAction::Clear => {
            let removed = repository.clear_cache().await?;
            println!("Removed {} cached translations", removed);
        }
    }

    Ok(())
}
