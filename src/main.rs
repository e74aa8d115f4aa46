use std::io::IsTerminal;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use codezen_core::{CodezenConfig, OutputFormat};
use codezen_review::llm::LlmClient;
use codezen_review::pipeline::{review_code, ReviewOutcome};
use miette::{Context, IntoDiagnostic, Result};

const CONFIG_FILE: &str = ".codezen.toml";

#[derive(Parser)]
#[command(
    name = "codezen",
    version,
    about = "AI-assisted code review backend powered by a local Ollama model",
    long_about = "CodeZen stores projects, coding guidelines, and code snapshots, asks a local\n\
                   Ollama model to review each snapshot, and keeps a follow-up conversation\n\
                   per review.\n\n\
                   Examples:\n  \
                     codezen serve                          Start the REST API\n  \
                     codezen review --language rust < x.rs  Review a snippet once\n  \
                     codezen init                           Create a .codezen.toml\n  \
                     codezen doctor                         Check setup and Ollama"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .codezen.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server
    #[command(long_about = "Start the REST API server.\n\n\
        Serves /api/v1/projects until Ctrl-C. Every request names its user in the\n\
        X-User-Email header.\n\n\
        Examples:\n  codezen serve\n  codezen serve --bind 0.0.0.0:8080 --database /var/lib/codezen.db")]
    Serve {
        /// Address to listen on (overrides [server].bind)
        #[arg(long)]
        bind: Option<String>,

        /// SQLite database path (overrides [database].path)
        #[arg(long)]
        database: Option<PathBuf>,
    },
    /// Review a code snippet once, without storing it
    #[command(long_about = "Review a code snippet once, without storing it.\n\n\
        Reads the code from --file or stdin, sends it to the configured Ollama model,\n\
        and prints the response with the extracted effort estimate.\n\n\
        Examples:\n  codezen review --language python --file app.py\n  \
        cat App.tsx | codezen review --language typescript --guideline 'No any types'")]
    Review {
        /// Read code from file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,

        /// Language label for the code fence
        #[arg(long)]
        language: String,

        /// Project guideline to include (repeatable)
        #[arg(long)]
        guideline: Vec<String>,
    },
    /// Create a default .codezen.toml configuration file
    #[command(long_about = "Create a default .codezen.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .codezen.toml already exists.")]
    Init,
    /// Check your CodeZen setup and environment
    #[command(long_about = "Check your CodeZen setup and environment.\n\n\
        Runs diagnostics for the config file, database location, and Ollama\n\
        reachability. Use --format json for machine-readable output.")]
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mcodezen\x1b[0m v{version}: code review with a local model\n");

        println!("Quick start:");
        println!("  \x1b[36mcodezen init\x1b[0m                   Create a .codezen.toml config file");
        println!("  \x1b[36mcodezen serve\x1b[0m                  Start the REST API");
        println!("  \x1b[36mcodezen review --language go\x1b[0m   Review code from stdin\n");
    } else {
        println!("codezen v{version}: code review with a local model\n");

        println!("Quick start:");
        println!("  codezen init                   Create a .codezen.toml config file");
        println!("  codezen serve                  Start the REST API");
        println!("  codezen review --language go   Review code from stdin\n");
    }

    println!("Run 'codezen <command> --help' for details.");
}

fn read_code_input(file: &Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err(format!("reading {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .into_diagnostic()
                .wrap_err("reading stdin")?;
            Ok(input)
        }
    }
}

fn load_config(path: &Option<PathBuf>) -> Result<CodezenConfig> {
    let mut config = match path {
        Some(path) => CodezenConfig::from_file(path)
            .wrap_err(format!("loading {}", path.display()))?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                CodezenConfig::from_file(default_path)?
            } else {
                CodezenConfig::default()
            }
        }
    };
    config.apply_env();
    Ok(config)
}

fn init_tracing(verbose: bool, serving: bool) {
    let default_level = match (verbose, serving) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self, use_color: bool) -> &'static str {
        match (self.status, use_color) {
            ("pass", true) => "\x1b[32m\u{2713}\x1b[0m",
            ("fail", true) => "\x1b[31m\u{2717}\x1b[0m",
            (_, true) => "\x1b[33m~\x1b[0m",
            ("pass", false) => "\u{2713}",
            ("fail", false) => "\u{2717}",
            (_, false) => "~",
        }
    }
}

async fn run_doctor(config: &CodezenConfig, format: OutputFormat, use_color: bool) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    if Path::new(CONFIG_FILE).exists() {
        checks.push(CheckResult::pass("config_file", format!("{CONFIG_FILE} found")));
    } else {
        checks.push(CheckResult::info(
            "config_file",
            format!("{CONFIG_FILE} not found, using defaults (run 'codezen init' to create one)"),
        ));
    }

    let db_path = &config.database.path;
    if db_path.exists() {
        checks.push(CheckResult::pass(
            "database",
            format!("{} exists", db_path.display()),
        ));
    } else {
        checks.push(CheckResult::info(
            "database",
            format!("{} will be created on first 'codezen serve'", db_path.display()),
        ));
    }

    let llm = LlmClient::new(&config.llm)?;
    checks.push(CheckResult::pass(
        "llm_model",
        format!("{} at {}", llm.model(), llm.base_url()),
    ));
    match llm.ping().await {
        Ok(()) => checks.push(CheckResult::pass("ollama", "reachable")),
        Err(e) => checks.push(CheckResult::fail(
            "ollama",
            e.to_string(),
            format!(
                "start Ollama and run 'ollama pull {}', or set OLLAMA_API_URL",
                llm.model()
            ),
        )),
    }

    let version = env!("CARGO_PKG_VERSION");
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "version": version,
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        _ => {
            println!("CodeZen v{version} environment check\n");
            for check in &checks {
                let label = check.name.replace('_', " ");
                println!("  {} {label:<12} {}", check.symbol(use_color), check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }
            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

fn print_outcome(outcome: &ReviewOutcome, format: OutputFormat) -> Result<()> {
    let effort = outcome.effort_estimation.as_deref().unwrap_or("unknown");
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(outcome).into_diagnostic()?
            );
        }
        OutputFormat::Markdown => print!("{}", render_markdown(outcome)),
        OutputFormat::Text => {
            println!("Effort: {effort}\n");
            println!("{}", outcome.response.trim());
        }
    }
    Ok(())
}

/// Markdown report. The response is fenced as `json` only when it looks like
/// a JSON object; prose and fallback text get a plain fence.
fn render_markdown(outcome: &ReviewOutcome) -> String {
    let effort = outcome.effort_estimation.as_deref().unwrap_or("unknown");
    let response = outcome.response.trim();
    let fence = if response.starts_with('{') { "json" } else { "" };
    format!("# Code Review\n\n**Effort:** {effort}\n\n```{fence}\n{response}\n```\n")
}

const DEFAULT_CONFIG: &str = r#"# CodeZen Configuration

[llm]
# Ollama server root; a full ".../api/generate" URL is accepted too.
# Env: OLLAMA_API_URL
# base_url = "http://localhost:11434"
# Env: OLLAMA_MODEL
# model = "codellama:7b"
# timeout_secs = 300

[server]
# Env: CODEZEN_BIND
# bind = "127.0.0.1:8080"

[database]
# Env: CODEZEN_DATABASE
# path = ".codezen/codezen.db"
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose, matches!(cli.command, Some(Command::Serve { .. })));

    let mut config = load_config(&cli.config)?;

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    if cli.verbose {
        eprintln!("format: {}", cli.format);
        eprintln!("model: {} at {}", config.llm.model, config.llm.base_url);
    }

    match cli.command {
        None => {
            print_welcome(use_color);
        }
        Some(Command::Serve { bind, database }) => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(database) = database {
                config.database.path = database;
            }
            codezen_api::run_server(&config).await?;
        }
        Some(Command::Review {
            ref file,
            ref language,
            ref guideline,
        }) => {
            let code = read_code_input(file)?;
            if code.trim().is_empty() {
                miette::bail!("no code to review (pass --file or pipe code on stdin)");
            }
            if language.trim().is_empty() {
                miette::bail!("--language must not be blank");
            }

            let llm = LlmClient::new(&config.llm)?;

            let spinner = if std::io::stderr().is_terminal() {
                let pb = indicatif::ProgressBar::new_spinner();
                if let Ok(style) =
                    indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                {
                    pb.set_style(style);
                }
                pb.set_message(format!("Reviewing with {}...", llm.model()));
                pb.enable_steady_tick(std::time::Duration::from_millis(120));
                Some(pb)
            } else {
                None
            };

            let outcome = review_code(&llm, &code, language, guideline.as_slice()).await;

            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }
            print_outcome(&outcome, cli.format)?;
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Doctor) => {
            run_doctor(&config, cli.format, use_color).await?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "codezen", &mut std::io::stdout());
        }
    }

    Ok(())
}
