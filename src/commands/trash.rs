use serde::Serialize;

use crate::cli::TrashArgs;
use crate::context::AppContext;
use crate::error::AppResult;

#[derive(Debug, Serialize)]
struct TrashResult {
    trashed: Vec<String>,
    not_found: Vec<String>,
}

pub async fn run(ctx: &AppContext, args: TrashArgs) -> AppResult<()> {
    let mut session = ctx.session()?;
    session.refresh(true).await?;

    let mut not_found = Vec::new();
    for id in &args.thread_ids {
        if session.mark_thread(id, true).is_err() {
            not_found.push(id.clone());
        }
    }

    let trashed = session.trash_marked_threads().await?;
    let mut text = format!("trashed {} thread(s)", trashed.len());
    if !not_found.is_empty() {
        text.push_str(&format!("; not found: {}", not_found.join(", ")));
    }

    ctx.output.emit(&text, &TrashResult { trashed, not_found })
}
