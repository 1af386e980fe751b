use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Plan(PlanArgs),
    Write(WriteArgs),
    Compile(CompileArgs),
    Status(StatusArgs),
    Story(StoryArgs),
    Sync {
        #[command(subcommand)]
        command: SyncCommand,
    },
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Main topic or theme for the book.
    #[arg(long)]
    pub topic: String,

    /// Number of chapters to plan.
    #[arg(long, default_value_t = 5)]
    pub chapters: usize,

    /// Root directory for book workspaces.
    #[arg(long, default_value = "books")]
    pub books_dir: String,

    /// Text model id.
    #[arg(long, default_value = "gemini-2.0-flash")]
    pub model: String,

    /// Base URL of the Generative Language API.
    #[arg(
        long,
        default_value = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub gemini_base_url: String,
}

#[derive(Debug, Args)]
pub struct WriteArgs {
    /// Title of the book to continue writing.
    #[arg(long)]
    pub title: String,

    /// Root directory for book workspaces.
    #[arg(long, default_value = "books")]
    pub books_dir: String,

    /// Text model id.
    #[arg(long, default_value = "gemini-2.0-flash")]
    pub model: String,

    /// Image model id for chapter illustrations.
    #[arg(long, default_value = "gemini-2.0-flash-exp-image-generation")]
    pub image_model: String,

    /// Base URL of the Generative Language API.
    #[arg(
        long,
        default_value = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub gemini_base_url: String,

    /// Mirror the metadata document to this remote collection after the
    /// chapter is recorded (best-effort).
    #[arg(long)]
    pub mirror_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Title of the book to compile.
    #[arg(long)]
    pub title: String,

    /// Root directory for book workspaces.
    #[arg(long, default_value = "books")]
    pub books_dir: String,

    /// Compile even if not every chapter is published; missing chapters
    /// become explicit placeholders.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Book title; every book under the books root is listed when omitted.
    #[arg(long)]
    pub title: Option<String>,

    /// Root directory for book workspaces.
    #[arg(long, default_value = "books")]
    pub books_dir: String,
}

#[derive(Debug, Args)]
pub struct StoryArgs {
    /// Topic or theme for a standalone short story.
    #[arg(long)]
    pub topic: String,

    /// Directory the finished story is saved to.
    #[arg(long, default_value = ".")]
    pub out_dir: String,

    /// Text model id.
    #[arg(long, default_value = "gemini-2.0-flash")]
    pub model: String,

    /// Base URL of the Generative Language API.
    #[arg(
        long,
        default_value = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub gemini_base_url: String,
}

#[derive(Debug, Subcommand)]
pub enum SyncCommand {
    Push(SyncPushArgs),
    Pull(SyncPullArgs),
    PushAll(SyncPushAllArgs),
    List(SyncListArgs),
}

#[derive(Debug, Args)]
pub struct SyncPushArgs {
    /// Base URL of the remote mirror collection.
    #[arg(long)]
    pub mirror_url: String,

    /// Root directory for book workspaces.
    #[arg(long, default_value = "books")]
    pub books_dir: String,

    /// Title of the book to mirror.
    #[arg(long)]
    pub title: String,
}

#[derive(Debug, Args)]
pub struct SyncPullArgs {
    /// Base URL of the remote mirror collection.
    #[arg(long)]
    pub mirror_url: String,

    /// Title of the book to look up.
    #[arg(long)]
    pub title: String,
}

#[derive(Debug, Args)]
pub struct SyncPushAllArgs {
    /// Base URL of the remote mirror collection.
    #[arg(long)]
    pub mirror_url: String,

    /// Root directory for book workspaces.
    #[arg(long, default_value = "books")]
    pub books_dir: String,
}

#[derive(Debug, Args)]
pub struct SyncListArgs {
    /// Base URL of the remote mirror collection.
    #[arg(long)]
    pub mirror_url: String,
}
