// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use alexandria::app_config::{self, Config, RewriterProvider};
use alexandria::file_utils::FileManager;
use alexandria::pipeline::{PipelineProgress, PipelineReport, PipelineStage};
use alexandria::script::OversizePolicy;
use alexandria::{PipelineOrchestrator, VoiceTable};

/// CLI Wrapper for RewriterProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliRewriterProvider {
    Ollama,
    Anthropic,
}

impl From<CliRewriterProvider> for RewriterProvider {
    fn from(cli_provider: CliRewriterProvider) -> Self {
        match cli_provider {
            CliRewriterProvider::Ollama => RewriterProvider::Ollama,
            CliRewriterProvider::Anthropic => RewriterProvider::Anthropic,
        }
    }
}

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

/// CLI Wrapper for OversizePolicy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliOversizePolicy {
    PassThrough,
    Split,
}

impl From<CliOversizePolicy> for OversizePolicy {
    fn from(cli_policy: CliOversizePolicy) -> Self {
        match cli_policy {
            CliOversizePolicy::PassThrough => OversizePolicy::PassThrough,
            CliOversizePolicy::Split => OversizePolicy::Split,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite a manuscript into a script and synthesise it (full run)
    Generate {
        /// Plain-text manuscript
        #[arg(value_name = "MANUSCRIPT")]
        manuscript: PathBuf,
    },

    /// Rewrite a manuscript into an annotated script only
    Script {
        /// Plain-text manuscript
        #[arg(value_name = "MANUSCRIPT")]
        manuscript: PathBuf,
    },

    /// Synthesise and assemble an existing annotated script
    Synthesize {
        /// Annotated script JSON written by `script` or `generate`
        #[arg(value_name = "SCRIPT_JSON")]
        script: PathBuf,

        /// Base name of the combined track (defaults to the script's file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List the speakers of a script and whether each has a usable voice
    Speakers {
        /// Annotated script JSON
        #[arg(value_name = "SCRIPT_JSON")]
        script: PathBuf,
    },

    /// Generate shell completions for alexandria
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Alexandria - manuscript to multi-speaker narrated audio
#[derive(Parser, Debug)]
#[command(name = "alexandria")]
#[command(version)]
#[command(about = "Turns a manuscript into a multi-speaker narrated audio track")]
#[command(long_about = "Alexandria rewrites prose into an attributed script with an LLM, then voices every speaker with a configured synthesis service and assembles one audio track.

EXAMPLES:
    alexandria generate book.txt                       # Full run using conf.json and voice_config.json
    alexandria script book.txt                         # Only write output_audio/annotated_script.json
    alexandria synthesize output_audio/annotated_script.json
    alexandria speakers output_audio/annotated_script.json
    alexandria -p anthropic -m claude-3-5-haiku-latest generate book.txt
    alexandria completions bash > alexandria.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file doesn't
    exist, a default one will be created automatically. Voices are read from
    voice_config.json, a JSON object keyed by speaker label.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Voice configuration file path
    #[arg(long, default_value = "voice_config.json", global = true)]
    voices: PathBuf,

    /// Directory receiving the script, segments and final track
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Rewriting provider to use
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliRewriterProvider>,

    /// Model name to use for rewriting
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Maximum characters per manuscript chunk
    #[arg(long, global = true)]
    max_chunk_chars: Option<usize>,

    /// Maximum characters per synthesis unit
    #[arg(long, global = true)]
    unit_budget: Option<usize>,

    /// Handling of single lines longer than the unit budget
    #[arg(long, value_enum, global = true)]
    oversize: Option<CliOversizePolicy>,

    /// Units synthesised in parallel
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Skip the synthesis connection test
    #[arg(long, global = true)]
    skip_connection_test: bool,
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
        // The boxed logger accepts everything; `log::set_max_level` does the filtering
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI colour for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌", "1;31"),
            Level::Warn => ("🚧", "1;33"),
            Level::Info => ("📖", "1;32"),
            Level::Debug => ("🔍", "1;36"),
            Level::Trace => ("📋", "1;35"),
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
            let (emoji, colour) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", colour, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

// @struct: Progress bars for the rewriting and synthesis stages
struct BarProgress {
    rewriting: ProgressBar,
    synthesis: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        Self {
            rewriting: Self::make_bar(),
            synthesis: Self::make_bar(),
        }
    }

    fn make_bar() -> ProgressBar {
        let bar = ProgressBar::hidden();
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg} ({percent}%) {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));
        bar
    }

    fn bar(&self, stage: PipelineStage) -> &ProgressBar {
        match stage {
            PipelineStage::Rewriting => &self.rewriting,
            PipelineStage::Synthesis => &self.synthesis,
        }
    }
}

impl PipelineProgress for BarProgress {
    fn started(&self, stage: PipelineStage, total: usize) {
        let bar = self.bar(stage);
        if std::io::stderr().is_terminal() {
            bar.set_draw_target(ProgressDrawTarget::stderr());
        }
        bar.set_length(total as u64);
        bar.set_position(0);
        bar.set_message(stage.to_string());
        bar.reset_elapsed();
    }

    fn advanced(&self, stage: PipelineStage) {
        self.bar(stage).inc(1);
    }

    fn finished(&self, stage: PipelineStage) {
        self.bar(stage).finish_and_clear();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "alexandria", &mut std::io::stdout());
        return Ok(());
    }

    // If log level is set via command line, apply it immediately
    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    let report = match &cli.command {
        Commands::Generate { manuscript } => {
            let voices = VoiceTable::load(&cli.voices).context("Failed to load voice configuration")?;
            info!("📚 Alexandria: {} voice(s), rewriting with {}", voices.len(), config.rewriter.provider.display_name());
            build_pipeline(&config, voices)?.run(manuscript).await?
        }
        Commands::Script { manuscript } => {
            build_pipeline(&config, VoiceTable::default())?
                .write_script(manuscript)
                .await?
        }
        Commands::Synthesize { script, name } => {
            let voices = VoiceTable::load(&cli.voices).context("Failed to load voice configuration")?;
            let entries = PipelineOrchestrator::load_script_artifact(script)?;
            let stem = name.clone().map(PathBuf::from).unwrap_or_else(|| script.clone());
            let output_path = FileManager::generate_output_path(&stem, &config.output_dir, "wav");
            build_pipeline(&config, voices)?
                .run_from_script(entries, &output_path)
                .await?
        }
        Commands::Speakers { script } => {
            list_speakers(script, &cli.voices)?;
            return Ok(());
        }
        Commands::Completions { .. } => return Ok(()),
    };

    finish(report)
}

/// Load conf.json (creating it if needed), apply CLI overrides and validate
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(Path::new(&cli.config_path))?;

    if let Some(provider) = &cli.provider {
        config.rewriter.provider = provider.clone().into();
    }
    if let Some(model) = &cli.model {
        config.rewriter.active_provider_config_mut().model = model.clone();
    }
    if let Some(output_dir) = &cli.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone().into();
    }
    if let Some(max_chunk_chars) = cli.max_chunk_chars {
        config.pipeline.max_chunk_chars = max_chunk_chars;
    }
    if let Some(unit_budget) = cli.unit_budget {
        config.pipeline.unit_char_budget = unit_budget;
    }
    if let Some(policy) = &cli.oversize {
        config.pipeline.oversize_policy = policy.clone().into();
    }
    if let Some(concurrency) = cli.concurrency {
        config.synthesis.concurrent_requests = concurrency;
    }
    if cli.skip_connection_test {
        config.synthesis.test_connection = false;
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

fn build_pipeline(config: &Config, voices: VoiceTable) -> Result<PipelineOrchestrator> {
    Ok(PipelineOrchestrator::from_config(config, voices)?.with_progress(Arc::new(BarProgress::new())))
}

/// Print the speaker census of a script against the voice table
fn list_speakers(script: &Path, voices_path: &Path) -> Result<()> {
    let entries = PipelineOrchestrator::load_script_artifact(script)?;
    let voices = VoiceTable::load(voices_path).unwrap_or_else(|e| {
        warn!("{}", e);
        VoiceTable::default()
    });

    let coverage = voices.coverage(&entries);
    println!("Found {} speakers in {}:", coverage.len(), script.display());
    for speaker in &coverage {
        match &speaker.issue {
            None => println!("  ✅ {} ({} entries)", speaker.speaker, speaker.entries),
            Some(issue) => println!("  ⚠️  {} ({} entries): {}", speaker.speaker, speaker.entries, issue),
        }
    }
    Ok(())
}

/// Log the summary; the no-content outcomes exit with status 2
fn finish(report: PipelineReport) -> Result<()> {
    for line in report.summary().lines() {
        info!("{}", line);
    }

    if !report.outcome.is_success() {
        error!("{}", report.outcome);
        std::process::exit(2);
    }
    Ok(())
}
