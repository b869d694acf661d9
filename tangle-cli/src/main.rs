use clap::Parser;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "tangle",
    version,
    about = "Derive the type-coupling graph of Java code from declared signatures"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Classify an error into an exit code.
///
/// Exit codes:
///   0  success
///   1  general/unknown error
///   2  configuration error
///   3  path not found / not analysed yet
///   4  database error
///   10 analysis completed with diagnostics under `--strict`
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    let msg = format!("{err:#}");
    let lower = msg.to_lowercase();

    if lower.contains("completed with") {
        10 // strict mode
    } else if lower.contains("not initialized") || lower.contains("cannot resolve path") {
        3 // path not found
    } else if lower.contains("config") {
        2 // config error
    } else if lower.contains("database")
        || lower.contains("sqlite")
        || lower.contains("cannot open database")
    {
        4 // database error
    } else {
        1 // general error
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match commands::run(cli.command, cli.quiet) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}
