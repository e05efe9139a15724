use crate::cli::ReadArgs;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::mail::{DisplayKind, DisplayNode};
use crate::mailbox::Mail;
use crate::output::OutputMode;

pub async fn run(ctx: &AppContext, args: ReadArgs) -> AppResult<()> {
    let mut session = ctx.session()?;
    session.refresh(true).await?;
    session.refresh_thread(&args.thread_id).await?;

    let thread = session
        .thread(&args.thread_id)
        .ok_or_else(|| AppError::InvalidInput(format!("no such thread in mailbox: {}", args.thread_id)))?;

    if ctx.output.mode() == OutputMode::Json {
        return ctx.output.emit(&thread.subject, thread);
    }

    println!("{}", thread.subject);
    for mail in &thread.mails {
        println!();
        print_mail(mail);
    }
    Ok(())
}

fn print_mail(mail: &Mail) {
    println!("from: {}", mail.from);
    println!("to: {}", mail.to.join(", "));
    println!("date: {}", mail.created.to_rfc3339());
    if let Some(warning) = &mail.warning {
        println!("warning: {warning}");
    }
    if let Some(error) = &mail.has_errors {
        println!("error: {error}");
        return;
    }

    println!();
    for node in mail.mime_content.iter().flatten() {
        println!("{}", render_node(node));
    }
}

fn render_node(node: &DisplayNode) -> String {
    match node.kind {
        DisplayKind::Text => node.content.clone(),
        DisplayKind::Image => format!("[{} image, {} bytes encoded]", node.mime_type, node.content.len()),
        DisplayKind::Unsupported | DisplayKind::Error => format!("[{}]", node.content),
    }
}
