use crate::cli::InviteArgs;
use crate::context::AppContext;
use crate::error::AppResult;

pub async fn run(ctx: &AppContext, args: InviteArgs) -> AppResult<()> {
    let session = ctx.session()?;
    let response = session.send_invite(&args.to).await?;
    let text = format!("sent invite {} to {}", response.id, args.to.join(", "));
    ctx.output.emit(&text, &response)
}
