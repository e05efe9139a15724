use serde::Serialize;

use crate::cli::ThreadsArgs;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::mailbox::Thread;

const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Serialize)]
struct ThreadSummary<'a> {
    id: &'a str,
    subject: &'a str,
    updated: String,
    participants: &'a [String],
    snippet: &'a str,
    messages: usize,
    unread: bool,
}

impl<'a> From<&'a Thread> for ThreadSummary<'a> {
    fn from(thread: &'a Thread) -> Self {
        Self {
            id: &thread.id,
            subject: &thread.subject,
            updated: thread.updated.to_rfc3339(),
            participants: &thread.participants,
            snippet: &thread.snippet,
            messages: thread.mails.len(),
            unread: thread.unread,
        }
    }
}

pub async fn run(ctx: &AppContext, args: ThreadsArgs) -> AppResult<()> {
    if args.limit == 0 {
        return Err(AppError::InvalidInput(
            "--limit must be greater than 0".to_string(),
        ));
    }

    let mut session = ctx.session()?;
    session.refresh(true).await?;

    let mut threads = session.mailbox().threads.iter().collect::<Vec<_>>();
    threads.sort_by(|a, b| b.updated.cmp(&a.updated));
    threads.truncate(args.limit);
    let summaries = threads
        .into_iter()
        .map(ThreadSummary::from)
        .collect::<Vec<_>>();

    let lines = summaries
        .iter()
        .flat_map(|summary| {
            let marker = if summary.unread { "*" } else { " " };
            [
                format!("{marker} {}  {}", summary.id, summary.subject),
                format!(
                    "  {}  {} message(s)  {}",
                    summary.updated,
                    summary.messages,
                    summary.participants.join(", ")
                ),
                format!("  {}", format_preview(summary.snippet)),
            ]
        })
        .collect::<Vec<_>>();

    ctx.output.emit_lines(&lines, "0 threads", &summaries)
}

fn format_preview(snippet: &str) -> String {
    let compact = snippet.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.chars().count() <= PREVIEW_CHARS {
        return compact;
    }
    let cut = compact.chars().take(PREVIEW_CHARS).collect::<String>();
    format!("{cut}...")
}
