use clap::Parser;
use lockbox::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init => lockbox::cli::commands::init::execute(&cli),
        Commands::Add {
            kind,
            ref name,
            ref metadata,
            ref file,
            local_only,
            offline,
        } => lockbox::cli::commands::add::execute(
            &cli,
            kind,
            name,
            metadata,
            file.as_deref(),
            local_only,
            offline,
        ),
        Commands::List => lockbox::cli::commands::list::execute(&cli),
        Commands::Show {
            id,
            ref out,
            refresh,
        } => lockbox::cli::commands::show::execute(&cli, id, out.as_deref(), refresh),
        Commands::Edit {
            id,
            ref file,
            offline,
        } => lockbox::cli::commands::edit::execute(&cli, id, file.as_deref(), offline),
        Commands::Delete { id, force } => lockbox::cli::commands::delete::execute(&cli, id, force),
        Commands::Sync { watch } => lockbox::cli::commands::sync::execute(&cli, watch),
        Commands::Version => lockbox::cli::commands::version::execute(),
    };

    if let Err(e) = result {
        lockbox::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Log to stderr.  `RUST_LOG` wins; otherwise warnings only, or debug
/// with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "lockbox=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
