use crate::cli::ContactsArgs;
use crate::context::AppContext;
use crate::error::AppResult;

pub async fn run(ctx: &AppContext, args: ContactsArgs) -> AppResult<()> {
    let mut session = ctx.session()?;
    session.refresh(true).await?;

    let suggestions = ctx.contacts.suggest(&args.prefix, args.limit);
    let lines = suggestions
        .iter()
        .map(|contact| format!("{}\t{}", contact.priority, contact.address))
        .collect::<Vec<_>>();
    ctx.output.emit_lines(&lines, "no contacts", &suggestions)
}
