//! compliance-tools: convert security compliance artifacts
//!
//! Converts between XCCDF benchmarks, InSpec profiles and results, CSV
//! exports, STIG Viewer checklists and CIS benchmark text.

#![allow(clippy::struct_excessive_bools, clippy::needless_pass_by_value)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use compliance_tools::{
    cli,
    config::{AppConfig, Validatable, CONFIG_DIR_NAME},
    model::HostMetadata,
    pipeline::exit_codes,
    reports::ProfileFormat,
};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build long version string with format support info
const fn build_long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\n\nInput Formats:",
        "\n  XCCDF 1.1/1.2 benchmarks, InSpec profile/results JSON,",
        "\n  CSV exports, CIS benchmark text",
        "\n\nOutput Formats:",
        "\n  InSpec profile (ruby, json), XCCDF, CSV, CKL, summary"
    )
}

#[derive(Parser)]
#[command(name = "compliance-tools")]
#[command(version, long_version = build_long_version())]
#[command(about = "Convert security compliance artifacts", long_about = None)]
#[command(after_help = "EXIT CODES:
    0  Success (compliance: threshold met)
    1  Threshold not met, or no threshold given
    3  Error occurred

EXAMPLES:
    # STIG benchmark to an InSpec profile
    compliance-tools xccdf2inspec -x U_RHEL_8_STIG_Manual-xccdf.xml -o rhel8-profile

    # Run results to a checklist
    compliance-tools inspec2ckl -j results.json -m metadata.json -o rhel8.ckl

    # Gate a pipeline on results
    compliance-tools compliance -j results.json -i '{compliance.min: 80, failed.critical.max: 0}'")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Fold repeated control ids instead of failing
    #[arg(long, global = true)]
    merge_duplicates: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

// ============================================================================
// Command argument structs (extracted for readability)
// ============================================================================

/// Profile layout flags shared by the *2inspec commands
#[derive(Args)]
struct ProfileArgs {
    /// Output directory (ruby) or file (json)
    #[arg(short, long, default_value = "profile")]
    output: PathBuf,

    /// Profile format (overrides the config file)
    #[arg(short, long, value_enum)]
    format: Option<ProfileFormat>,

    /// Write every control into one file
    #[arg(long)]
    single_file: bool,

    /// Profile metadata JSON (maintainer, copyright, license...)
    #[arg(long)]
    metadata: Option<PathBuf>,
}

/// Host fields for the checklist ASSET block
#[derive(Args, Default)]
struct HostArgs {
    /// STIG id
    #[arg(long)]
    stigid: Option<String>,
    /// Asset role (None, Workstation, Member Server, Domain Controller)
    #[arg(long)]
    role: Option<String>,
    /// Asset type (Computing, Non-Computing)
    #[arg(long = "type")]
    asset_type: Option<String>,
    #[arg(long)]
    hostname: Option<String>,
    #[arg(long)]
    ip: Option<String>,
    #[arg(long)]
    mac: Option<String>,
    #[arg(long)]
    fqdn: Option<String>,
    #[arg(long)]
    tech_area: Option<String>,
    #[arg(long)]
    target_key: Option<String>,
    /// true or false
    #[arg(long)]
    web_or_database: Option<String>,
    #[arg(long)]
    web_db_site: Option<String>,
    #[arg(long)]
    web_db_instance: Option<String>,
}

impl HostArgs {
    fn to_host(&self) -> HostMetadata {
        HostMetadata {
            stigid: self.stigid.clone(),
            role: self.role.clone(),
            asset_type: self.asset_type.clone(),
            hostname: self.hostname.clone(),
            ip: self.ip.clone(),
            mac: self.mac.clone(),
            fqdn: self.fqdn.clone(),
            tech_area: self.tech_area.clone(),
            target_key: self.target_key.clone(),
            web_or_database: self.web_or_database.clone(),
            web_db_site: self.web_db_site.clone(),
            web_db_instance: self.web_db_instance.clone(),
        }
    }

    fn pairs(&self) -> Vec<(&'static str, Option<String>)> {
        let host = self.to_host();
        vec![
            ("stigid", host.stigid),
            ("role", host.role),
            ("type", host.asset_type),
            ("hostname", host.hostname),
            ("ip", host.ip),
            ("mac", host.mac),
            ("fqdn", host.fqdn),
            ("tech_area", host.tech_area),
            ("target_key", host.target_key),
            ("web_or_database", host.web_or_database),
            ("web_db_site", host.web_db_site),
            ("web_db_instance", host.web_db_instance),
        ]
    }
}

/// Arguments for the `xccdf2inspec` subcommand
#[derive(Parser)]
struct Xccdf2InspecArgs {
    /// XCCDF benchmark file
    #[arg(short, long)]
    xccdf: PathBuf,

    #[command(flatten)]
    profile: ProfileArgs,

    /// Write benchmark attributes to this YAML file
    #[arg(short, long)]
    attributes: Option<PathBuf>,

    /// Tag renames as old=new
    #[arg(short, long, num_args = 1..)]
    replace_tags: Vec<String>,

    /// YAML/JSON file of tag renames
    #[arg(long)]
    replace_tags_file: Option<PathBuf>,
}

/// Arguments for the `inspec2xccdf` subcommand
#[derive(Parser)]
struct Inspec2XccdfArgs {
    /// InSpec profile JSON (`inspec json`)
    #[arg(short = 'j', long)]
    inspec_json: PathBuf,

    /// Benchmark attributes YAML
    #[arg(short, long)]
    attributes: Option<PathBuf>,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Arguments for the `csv2inspec` subcommand
#[derive(Parser)]
struct Csv2InspecArgs {
    /// CSV file
    #[arg(short, long)]
    csv: PathBuf,

    /// Column mapping YAML (see `generate-map`)
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    #[command(flatten)]
    profile: ProfileArgs,

    /// Tag renames as old=new
    #[arg(short, long, num_args = 1..)]
    replace_tags: Vec<String>,
}

/// Arguments for the `inspec2csv` subcommand
#[derive(Parser)]
struct Inspec2CsvArgs {
    /// InSpec profile or results JSON
    #[arg(short = 'j', long)]
    inspec_json: PathBuf,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export column mapping YAML
    #[arg(long)]
    export_mapping: Option<PathBuf>,

    /// Append each control's final result status
    #[arg(long)]
    with_status: bool,
}

/// Arguments for the `inspec2ckl` subcommand
#[derive(Parser)]
struct Inspec2CklArgs {
    /// `inspec exec --reporter json` output
    #[arg(short = 'j', long)]
    inspec_json: PathBuf,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Host metadata JSON (see `generate-ckl-metadata`)
    #[arg(short, long)]
    metadata: Option<PathBuf>,

    #[command(flatten)]
    host: HostArgs,
}

/// Arguments for the `pdf2inspec` subcommand
#[derive(Parser)]
struct Pdf2InspecArgs {
    /// Benchmark text extracted from the PDF
    #[arg(short, long)]
    pdf: PathBuf,

    /// Profile name (defaults to the input file stem)
    #[arg(long)]
    name: Option<String>,

    #[command(flatten)]
    profile: ProfileArgs,
}

/// Arguments for the `generate-inspec-metadata` subcommand
#[derive(Parser)]
struct GenerateInspecMetadataArgs {
    #[arg(long)]
    maintainer: Option<String>,
    #[arg(long)]
    copyright: Option<String>,
    #[arg(long)]
    copyright_email: Option<String>,
    #[arg(long)]
    license: Option<String>,
    /// Profile version
    #[arg(long)]
    profile_version: Option<String>,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Arguments for the `summary` subcommand
#[derive(Parser)]
struct SummaryArgs {
    /// `inspec exec --reporter json` output
    #[arg(short = 'j', long)]
    inspec_json: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: cli::SummaryFormat,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Arguments for the `compliance` subcommand
#[derive(Parser)]
struct ComplianceArgs {
    /// `inspec exec --reporter json` output
    #[arg(short = 'j', long)]
    inspec_json: PathBuf,

    /// Threshold spec file (YAML or JSON)
    #[arg(short = 'f', long, conflicts_with = "threshold_inline")]
    threshold_file: Option<PathBuf>,

    /// Threshold spec as inline YAML/JSON
    #[arg(short = 'i', long)]
    threshold_inline: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an XCCDF benchmark to an InSpec profile
    Xccdf2inspec(Xccdf2InspecArgs),

    /// Convert an InSpec profile to an XCCDF benchmark
    Inspec2xccdf(Inspec2XccdfArgs),

    /// Convert a CSV export to an InSpec profile
    Csv2inspec(Csv2InspecArgs),

    /// Convert an InSpec profile or results to CSV
    Inspec2csv(Inspec2CsvArgs),

    /// Convert InSpec results to a STIG Viewer checklist
    Inspec2ckl(Inspec2CklArgs),

    /// Convert CIS benchmark text to an InSpec profile
    Pdf2inspec(Pdf2InspecArgs),

    /// Print a CSV column mapping template
    GenerateMap {
        /// Output file path (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a checklist host metadata file
    GenerateCklMetadata {
        #[command(flatten)]
        host: HostArgs,

        /// Output file path (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a profile metadata file
    GenerateInspecMetadata(GenerateInspecMetadataArgs),

    /// Summarize InSpec results
    Summary(SummaryArgs),

    /// Check InSpec results against a compliance threshold
    Compliance(ComplianceArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate JSON Schema for the config file format
    ConfigSchema {
        /// Write schema to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show, discover, or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Sub-subcommands for the `config` command
#[derive(Subcommand)]
enum ConfigAction {
    /// Print current effective configuration (merged from defaults + file)
    Show,
    /// Print config file search paths and discovered config file
    Path,
    /// Generate an example .compliance-tools.yaml in the current directory
    Init,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    match run(cli) {
        Ok(exit_code) => {
            if exit_code != exit_codes::SUCCESS {
                std::process::exit(exit_code);
            }
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(exit_codes::ERROR);
        }
    }
}

/// Effective configuration: config file, then command-line flags.
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut overrides = AppConfig::builder()
        .quiet(cli.quiet)
        .merge_duplicates(cli.merge_duplicates)
        .build();
    overrides.behavior.verbose = cli.verbose;

    let (config, loaded_from) = AppConfig::from_file_with_overrides(cli.config.as_deref(), &overrides)
        .context("Failed to load configuration")?;
    if let Some(path) = &loaded_from {
        tracing::debug!("Using config file {}", path.display());
    }
    for problem in config.validate() {
        tracing::warn!("Config: {}", problem);
    }
    Ok(config)
}

/// Dispatch to command handlers, returning the process exit code.
fn run(cli: Cli) -> Result<i32> {
    let config = load_config(&cli)?;
    let quiet = config.behavior.quiet;

    match cli.command {
        Commands::Xccdf2inspec(args) => {
            let options = cli::XccdfImportOptions {
                input: args.xccdf,
                output: args.profile.output,
                format: args.profile.format,
                single_file: args.profile.single_file,
                replace_tags: args.replace_tags,
                replace_tags_file: args.replace_tags_file,
                attributes: args.attributes,
                metadata: args.profile.metadata,
            };
            cli::run_xccdf2inspec(options, &config)?;
        }

        Commands::Inspec2xccdf(args) => {
            let options = cli::XccdfExportOptions {
                input: args.inspec_json,
                attributes: args.attributes,
                output: args.output,
            };
            cli::run_inspec2xccdf(options, &config)?;
        }

        Commands::Csv2inspec(args) => {
            let options = cli::CsvImportOptions {
                input: args.csv,
                output: args.profile.output,
                mapping: args.mapping,
                format: args.profile.format,
                single_file: args.profile.single_file,
                replace_tags: args.replace_tags,
                metadata: args.profile.metadata,
            };
            cli::run_csv2inspec(options, &config)?;
        }

        Commands::Inspec2csv(args) => {
            let options = cli::CsvExportOptions {
                input: args.inspec_json,
                output: args.output,
                export_mapping: args.export_mapping,
                with_status: args.with_status,
            };
            cli::run_inspec2csv(options, &config)?;
        }

        Commands::Inspec2ckl(args) => {
            let options = cli::CklOptions {
                input: args.inspec_json,
                output: args.output,
                metadata: args.metadata,
                host: args.host.to_host(),
            };
            cli::run_inspec2ckl(options, &config)?;
        }

        Commands::Pdf2inspec(args) => {
            let options = cli::PdfImportOptions {
                input: args.pdf,
                output: args.profile.output,
                name: args.name,
                format: args.profile.format,
                single_file: args.profile.single_file,
                metadata: args.profile.metadata,
            };
            cli::run_pdf2inspec(options, &config)?;
        }

        Commands::GenerateMap { output } => cli::run_generate_map(output, quiet)?,

        Commands::GenerateCklMetadata { host, output } => {
            cli::run_generate_ckl_metadata(&host.pairs(), output, quiet)?;
        }

        Commands::GenerateInspecMetadata(args) => {
            let values = [
                ("maintainer", args.maintainer),
                ("copyright", args.copyright),
                ("copyright_email", args.copyright_email),
                ("license", args.license),
                ("version", args.profile_version),
            ];
            cli::run_generate_inspec_metadata(&values, args.output, quiet)?;
        }

        Commands::Summary(args) => {
            cli::run_summary(&args.inspec_json, args.format, args.output, &config)?;
        }

        Commands::Compliance(args) => {
            let source = match (args.threshold_file, args.threshold_inline) {
                (Some(path), _) => Some(cli::ThresholdSource::File(path)),
                (None, Some(text)) => Some(cli::ThresholdSource::Inline(text)),
                (None, None) => None,
            };
            return cli::run_compliance(&args.inspec_json, source, &config);
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "compliance-tools", &mut io::stdout());
        }

        Commands::ConfigSchema { output } => {
            let schema = compliance_tools::config::generate_json_schema()
                .context("failed to generate schema")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &schema)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("Schema written to {}", path.display());
                }
                None => println!("{schema}"),
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let (config, loaded_from) =
                    AppConfig::from_file_with_overrides(cli.config.as_deref(), &AppConfig::default())
                        .context("Failed to load configuration")?;
                if let Some(path) = &loaded_from {
                    eprintln!("# Loaded from: {}", path.display());
                } else {
                    eprintln!("# No config file found; showing defaults");
                }
                let yaml =
                    serde_yaml_ng::to_string(&config).context("failed to serialize config")?;
                print!("{yaml}");
            }
            ConfigAction::Path => {
                let search_paths: [Option<String>; 3] = [
                    std::env::current_dir()
                        .ok()
                        .map(|p| p.display().to_string()),
                    ::dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME).display().to_string()),
                    ::dirs::home_dir().map(|p| p.display().to_string()),
                ];
                eprintln!("Config file search paths (in order):");
                for path in search_paths.into_iter().flatten() {
                    eprintln!("  {path}");
                }
                eprintln!();
                eprintln!("Recognized file names:");
                for name in compliance_tools::config::file::CONFIG_FILE_NAMES {
                    eprintln!("  {name}");
                }
                eprintln!();
                match compliance_tools::config::discover_config_file(cli.config.as_deref()) {
                    Some(path) => eprintln!("Active config file: {}", path.display()),
                    None => eprintln!("No config file found."),
                }
            }
            ConfigAction::Init => {
                let target = std::env::current_dir()
                    .context("cannot determine current directory")?
                    .join(".compliance-tools.yaml");
                if target.exists() {
                    anyhow::bail!(
                        "{} already exists. Remove it first to re-initialize.",
                        target.display()
                    );
                }
                let content = compliance_tools::config::generate_full_example_config();
                std::fs::write(&target, content)
                    .with_context(|| format!("failed to write {}", target.display()))?;
                eprintln!("Created {}", target.display());
            }
        },
    }

    Ok(exit_codes::SUCCESS)
}
