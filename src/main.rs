use clap::{Parser, Subcommand};
use quiet_logos::config::{self, Mode, RegenerationPolicy, SiteConfig};
use quiet_logos::generate::{self, BuildPaths};
use quiet_logos::provider::FallbackProvider;
use quiet_logos::{output, template};
use std::path::{Path, PathBuf};

/// Commentary strategy overrides shared by commands that generate commentary.
#[derive(clap::Args, Clone)]
struct ModeArgs {
    /// Commentary mode: local engine only, or remote provider with local fallback
    #[arg(long, value_enum)]
    mode: Option<Mode>,
}

fn version_string() -> &'static str {
    let on_tag = env!("QUIET_LOGOS_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("QUIET_LOGOS_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "quiet-logos")]
#[command(about = "Static site generator for dated diary entries")]
#[command(long_about = "\
Static site generator for dated diary entries

Every YYYY-MM-DD.md file in the source directory becomes a page. Each page
gets a short reflective commentary, prev/next links to its neighbors, and a
line in the index.

Source structure:

  log/
  ├── config.toml          # Site config (optional)
  ├── _template.html       # Page template ({{ title }}, {{ css }},
  │                        #   {{ content }}, <!-- commentary -->)
  ├── 2025-01-01.md        # Entry: optional '# Title', then
  └── 2025-01-02.md        #   '## quiet' and '## tech' sections

Commentary comes from a local text-analysis engine. With --mode real and
OPENAI_API_KEY set, a remote model is tried first; any failure falls back to
the local engine.

Run 'quiet-logos gen-config' to generate a documented config.toml and
'quiet-logos gen-template' for a starter _template.html.")]
#[command(version = version_string())]
struct Cli {
    /// Source directory with the diary entries
    #[arg(long, default_value = "log", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "site", global = true)]
    output: PathBuf,

    /// Page template [default: <source>/_template.html]
    #[arg(long, global = true)]
    template: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the whole site
    Build {
        /// Which entries get fresh commentary [default: latest-only under CI, all otherwise]
        #[arg(long, value_enum)]
        regenerate: Option<RegenerationPolicy>,

        #[command(flatten)]
        mode: ModeArgs,
    },
    /// Validate the source directory and template without building
    Check,
    /// Print the commentary for a single entry
    Comment {
        /// Entry date, YYYY-MM-DD
        date: String,

        /// Add a reference link to this URL
        #[arg(long)]
        href: Option<String>,

        #[command(flatten)]
        mode: ModeArgs,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
    /// Print the stock page template
    GenTemplate,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Build { regenerate, mode } => {
            let mut config = load_site_config(&cli.source)?;
            apply_mode(&mut config, mode);
            if let Some(policy) = regenerate {
                config.commentary.regenerate = Some(*policy);
            }
            let paths = build_paths(&cli, &config);
            let provider = FallbackProvider::from_config(&config);

            println!(
                "==> Building {} → {}",
                paths.source.display(),
                paths.output.display()
            );
            let report = generate::build(&paths, &config, &provider)?;
            output::print_build_output(&report);
            println!("==> Build complete: {}", report.output.display());
        }
        Command::Check => {
            let config = load_site_config(&cli.source)?;
            let paths = build_paths(&cli, &config);
            println!("==> Checking {}", paths.source.display());
            let report = generate::check(&paths, &config)?;
            output::print_check_output(&report);
            println!("==> Source is valid");
        }
        Command::Comment { date, href, mode } => {
            let mut config = load_site_config(&cli.source)?;
            apply_mode(&mut config, mode);
            let provider = FallbackProvider::from_config(&config);
            let generated =
                generate::comment(&cli.source, date, href.as_deref(), &config, &provider)?;
            println!("{}", generated.fragment);
            output::print_warnings(&[], &generated.warning.into_iter().collect::<Vec<_>>());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::GenTemplate => {
            print!("{}", template::stock_template());
        }
    }

    Ok(())
}

/// File config layered with the environment. The only place the process
/// environment is read.
fn load_site_config(source: &Path) -> Result<SiteConfig, config::ConfigError> {
    let mut config = config::load_config(source)?;
    config::apply_env(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

fn apply_mode(config: &mut SiteConfig, args: &ModeArgs) {
    if let Some(mode) = args.mode {
        config.commentary.mode = mode;
    }
}

fn build_paths(cli: &Cli, config: &SiteConfig) -> BuildPaths {
    let paths = BuildPaths::new(&cli.source, &cli.output, config);
    match &cli.template {
        Some(template) => paths.with_template(template),
        None => paths,
    }
}
