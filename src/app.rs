use crate::cli::{Cli, Command};
use crate::commands;
use crate::context::AppContext;
use crate::error::AppResult;

pub async fn run(cli: Cli) -> AppResult<()> {
    let Cli {
        profile,
        json,
        command,
        ..
    } = cli;

    let ctx = AppContext::bootstrap(profile, json)?;

    match command {
        Command::Auth(args) => commands::auth::run(&ctx, args.command).await,
        Command::Threads(args) => commands::threads::run(&ctx, args).await,
        Command::Read(args) => commands::read::run(&ctx, args).await,
        Command::Send(args) => commands::send::run(&ctx, args).await,
        Command::Trash(args) => commands::trash::run(&ctx, args).await,
        Command::Invite(args) => commands::invite::run(&ctx, args).await,
        Command::Contacts(args) => commands::contacts::run(&ctx, args).await,
    }
}
