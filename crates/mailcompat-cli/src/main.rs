mod commands;
mod reader;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::check::{run_check, CheckArgs};
use commands::dataset::run_dataset;
use commands::OutputFormat;

#[derive(Parser)]
#[command(
    name = "mailcompat",
    version,
    about = "Email HTML compatibility checker: score markup against Can I Email client support data"
)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score HTML against the compatibility dataset
    Check {
        /// Inline HTML, a file, a directory of .html/.htm files, an http(s) URL, or `-` for stdin.
        /// Several values are joined with a space.
        sources: Vec<String>,

        /// Output format
        #[arg(long, value_enum, env = "MAILCOMPAT_FORMAT")]
        format: Option<OutputFormat>,

        /// Tokens to leave out of the report, comma separated
        #[arg(long, env = "MAILCOMPAT_IGNORE", value_delimiter = ',')]
        ignore: Vec<String>,

        /// Run the accessibility audit
        #[arg(long)]
        audit: bool,

        /// Accessibility rule tags, comma separated
        #[arg(long, env = "MAILCOMPAT_AUDIT_TAGS", value_delimiter = ',')]
        audit_tags: Vec<String>,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Project config file (defaults to ./mailcompat.config.yaml when present)
        #[arg(long, env = "MAILCOMPAT_CONFIG")]
        config: Option<PathBuf>,

        /// Can I Email JSON snapshot to score against instead of the bundled sample
        #[arg(long, env = "MAILCOMPAT_DATASET")]
        dataset: Option<PathBuf>,
    },

    /// Show feature, client and operating-system counts of the dataset
    Dataset {
        /// Output format
        #[arg(long, value_enum, env = "MAILCOMPAT_FORMAT", default_value = "human")]
        format: OutputFormat,

        /// Can I Email JSON snapshot to describe instead of the bundled sample
        #[arg(long, env = "MAILCOMPAT_DATASET")]
        dataset: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check {
            sources,
            format,
            ignore,
            audit,
            audit_tags,
            output,
            config,
            dataset,
        } => {
            let args = CheckArgs {
                sources,
                format,
                ignore,
                audit,
                audit_tags,
                output,
                config,
                dataset,
            };
            match run_check(&args) {
                Ok(outcome) => {
                    println!("{}", outcome.output);
                    if outcome.audit_error {
                        process::exit(2);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        }
        Commands::Dataset { format, dataset } => match run_dataset(format, dataset.as_deref()) {
            Ok(output) => {
                println!("{output}");
            }
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
    }
}
