pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod contacts;
pub mod context;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod mail;
pub mod mailbox;
pub mod notices;
pub mod output;
pub mod sync;

use cli::Cli;
use error::AppResult;

pub async fn run(cli: Cli) -> AppResult<()> {
    app::run(cli).await
}
