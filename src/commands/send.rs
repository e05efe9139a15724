use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use crate::api::models::Attachment;
use crate::cli::SendArgs;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::notices;
use crate::sync::OutgoingMail;

pub async fn run(ctx: &AppContext, args: SendArgs) -> AppResult<()> {
    let content = read_body(&args)?;
    let attachments = read_attachments(&args.attach)?;
    let subject = args
        .subject
        .map(|subject| subject.trim().to_string())
        .filter(|subject| !subject.is_empty())
        .unwrap_or_else(|| notices::NO_SUBJECT.to_string());

    let mut session = ctx.session()?;
    let response = session
        .encrypt_and_send(OutgoingMail {
            recipients: args.to,
            thread_id: args.thread,
            in_reply_to: args.in_reply_to,
            subject,
            content,
            attachments,
        })
        .await?;

    let text = format!("sent message {}", response.id);
    ctx.output.emit(&text, &response)
}

fn read_body(args: &SendArgs) -> AppResult<String> {
    let selected = [args.body.is_some(), args.body_file.is_some(), args.stdin]
        .into_iter()
        .filter(|selected| *selected)
        .count();

    match selected {
        0 => {
            return Err(AppError::InvalidInput(
                "missing body source; pass one of --body, --body-file, or --stdin".to_string(),
            ));
        }
        1 => {}
        _ => {
            return Err(AppError::InvalidInput(
                "pass only one body source: --body, --body-file, or --stdin".to_string(),
            ));
        }
    }

    if let Some(body) = &args.body {
        return Ok(body.clone());
    }
    if let Some(path) = &args.body_file {
        return Ok(fs::read_to_string(path)?);
    }

    let mut body = String::new();
    io::stdin().read_to_string(&mut body)?;
    Ok(body)
}

fn read_attachments(paths: &[PathBuf]) -> AppResult<Vec<Attachment>> {
    paths
        .iter()
        .map(|path| {
            let filename = path
                .file_name()
                .map(|value| value.to_string_lossy().to_string())
                .ok_or_else(|| {
                    AppError::InvalidInput(format!("invalid attachment path: {}", path.display()))
                })?;
            let mime_type = mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string();

            Ok(Attachment {
                filename,
                mime_type,
                data: fs::read(path)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(body: Option<&str>, stdin: bool) -> SendArgs {
        SendArgs {
            to: vec!["b@x.com".to_string()],
            subject: None,
            body: body.map(ToOwned::to_owned),
            body_file: None,
            stdin,
            thread: None,
            in_reply_to: None,
            attach: Vec::new(),
        }
    }

    #[test]
    fn requires_exactly_one_body_source() {
        assert!(matches!(read_body(&args(None, false)), Err(AppError::InvalidInput(_))));
        assert!(matches!(read_body(&args(Some("hi"), true)), Err(AppError::InvalidInput(_))));
        assert_eq!(read_body(&args(Some("hi"), false)).expect("body"), "hi");
    }

    #[test]
    fn guesses_attachment_type_from_name() {
        let path = std::env::temp_dir().join(format!("pgpmail-attach-{}.png", std::process::id()));
        fs::write(&path, [0x89, b'P', b'N', b'G']).expect("write attachment");

        let attachments = read_attachments(std::slice::from_ref(&path)).expect("attachments");
        let _ = fs::remove_file(&path);

        assert_eq!(attachments[0].mime_type, "image/png");
        assert_eq!(attachments[0].data.len(), 4);
    }
}
