//! git-review-rebase CLI - Review a rebased branch commit by commit.

use clap::Parser;

mod commands;
mod output;
mod services;

use commands::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = cli.init_tracing() {
        output::warn(&format!("Logging disabled: {e}"));
    }
    let path = cli.path.as_deref();

    let result = match &cli.command {
        Commands::Matches {
            range,
            json,
            with,
            without,
            search,
        } => commands::matches::run(
            path,
            range,
            &commands::matches::ListOptions {
                json: *json,
                with,
                without,
                search,
            },
        ),
        Commands::Diff {
            range,
            target,
            blame,
            width,
            no_function_context,
            search,
        } => {
            commands::diff::run(
                path,
                range,
                target.as_deref(),
                &commands::diff::DiffOptions {
                    blame: *blame,
                    width: *width,
                    no_function_context: *no_function_context,
                    search: search.as_deref(),
                },
            )
            .await
        }
        Commands::Review {
            range,
            target,
            undo,
        } => commands::review::run(path, range, target.as_deref(), *undo),
        Commands::Legend => commands::legend::run(),
        Commands::Completions { shell } => commands::completions::run(*shell),
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
