use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    bookwright::logging::init().context("init logging")?;

    let cli = bookwright::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        bookwright::cli::Command::Plan(args) => {
            bookwright::pipeline::run_plan(args).await.context("plan")?;
        }
        bookwright::cli::Command::Write(args) => {
            bookwright::pipeline::run_write(args).await.context("write")?;
        }
        bookwright::cli::Command::Compile(args) => {
            bookwright::pipeline::run_compile(args).context("compile")?;
        }
        bookwright::cli::Command::Status(args) => {
            bookwright::pipeline::run_status(args).context("status")?;
        }
        bookwright::cli::Command::Story(args) => {
            bookwright::pipeline::run_story(args).await.context("story")?;
        }
        bookwright::cli::Command::Sync {
            command: bookwright::cli::SyncCommand::Push(args),
        } => {
            bookwright::remote::run_push(args).await.context("sync push")?;
        }
        bookwright::cli::Command::Sync {
            command: bookwright::cli::SyncCommand::Pull(args),
        } => {
            bookwright::remote::run_pull(args).await.context("sync pull")?;
        }
        bookwright::cli::Command::Sync {
            command: bookwright::cli::SyncCommand::PushAll(args),
        } => {
            bookwright::remote::run_push_all(args)
                .await
                .context("sync push-all")?;
        }
        bookwright::cli::Command::Sync {
            command: bookwright::cli::SyncCommand::List(args),
        } => {
            bookwright::remote::run_list(args).await.context("sync list")?;
        }
    }

    Ok(())
}
