use crate::commands::Commands;

use clap::Parser;

#[derive(Parser)]
#[command(name = "gsm")]
#[command(about = "Dedicated game server lifecycle and upgrade manager")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    /// Instance profile id (defaults to the first configured instance)
    #[arg(long, global = true)]
    pub(crate) profile: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub(crate) pretty: bool,
}
