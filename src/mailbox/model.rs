use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::mail::{DisplayKind, DisplayNode};
use crate::notices;

const MAX_SNIPPET_CHARS: usize = 100;

/// Local index of the owner's encrypted conversations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Mailbox {
    pub email: String,
    pub threads: Vec<Thread>,
    pub status: Option<String>,
}

impl Mailbox {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn thread(&self, id: &str) -> Option<&Thread> {
        self.threads.iter().find(|thread| thread.id == id)
    }

    pub fn thread_mut(&mut self, id: &str) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|thread| thread.id == id)
    }

    pub fn remove_thread(&mut self, id: &str) -> Option<Thread> {
        let index = self.threads.iter().position(|thread| thread.id == id)?;
        Some(self.threads.remove(index))
    }

    /// Drops decrypted content from the error-free mails of a thread. Unknown
    /// ids are ignored.
    pub fn release_content(&mut self, thread_id: &str) -> usize {
        self.thread_mut(thread_id)
            .map(Thread::release_content)
            .unwrap_or_default()
    }

    pub fn marked_thread_ids(&self) -> Vec<String> {
        self.threads
            .iter()
            .filter(|thread| thread.marked)
            .map(|thread| thread.id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    pub id: String,
    pub subject: String,
    pub updated: DateTime<Utc>,
    pub from: String,
    pub participants: Vec<String>,
    pub to: Vec<String>,
    pub snippet: String,
    pub mails: Vec<Mail>,
    pub unread: bool,
    pub marked: bool,
    pub message_id: String,
}

impl Thread {
    /// Starts a thread from its first known mail. The summary fields are
    /// filled in by [`Thread::summarize`].
    pub fn from_first_mail(id: impl Into<String>, mail: &Mail) -> Self {
        Self {
            id: id.into(),
            subject: mail.subject.clone(),
            updated: mail.created,
            from: mail.from.clone(),
            participants: vec![mail.from.clone()],
            to: mail.to.clone(),
            snippet: notices::INITIAL_SNIPPET.to_string(),
            mails: Vec::new(),
            unread: mail.unread,
            marked: false,
            message_id: mail.message_id.clone(),
        }
    }

    pub fn mail(&self, id: &str) -> Option<&Mail> {
        self.mails.iter().find(|mail| mail.id == id)
    }

    pub fn mail_mut(&mut self, id: &str) -> Option<&mut Mail> {
        self.mails.iter_mut().find(|mail| mail.id == id)
    }

    pub fn contains_mail(&self, id: &str) -> bool {
        self.mail(id).is_some()
    }

    /// Folds one mail into the thread aggregates. The newest mail owns the
    /// timestamp, reply target and snippet.
    pub fn summarize(&mut self, mail_id: &str) {
        let Some(mail) = self.mails.iter().find(|mail| mail.id == mail_id) else {
            return;
        };

        if !self.participants.contains(&mail.from) {
            self.participants.push(mail.from.clone());
        }
        if mail.unread {
            self.unread = true;
        }
        if mail.created >= self.updated {
            self.updated = mail.created;
            self.message_id = mail.message_id.clone();
            if let Some(snippet) = mail.snippet() {
                self.snippet = snippet;
            }
        }
    }

    pub fn recompute_unread(&mut self) {
        self.unread = self.mails.iter().any(|mail| mail.unread);
    }

    pub fn release_content(&mut self) -> usize {
        let mut released = 0;
        for mail in self.mails.iter_mut().filter(|mail| mail.has_errors.is_none()) {
            if mail.mime_content.take().is_some() {
                released += 1;
            }
        }
        released
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Mail {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub to: Vec<String>,
    pub created: DateTime<Utc>,
    pub message_id: String,
    pub unread: bool,
    pub mime_content: Option<Vec<DisplayNode>>,
    pub warning: Option<String>,
    pub status: Option<String>,
    pub has_errors: Option<String>,
}

impl Mail {
    pub fn needs_content(&self) -> bool {
        self.has_errors.is_none() && self.mime_content.is_none()
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.has_errors = Some(message.into());
        self.status = None;
    }

    pub fn set_content(&mut self, nodes: Vec<DisplayNode>, warning: Option<String>) {
        self.mime_content = Some(nodes);
        self.warning = warning;
        self.has_errors = None;
        self.status = None;
    }

    /// Summary text for the thread list, or `None` while the content is not
    /// decrypted.
    fn snippet(&self) -> Option<String> {
        let nodes = self.mime_content.as_ref()?;
        let text = nodes.iter().find(|node| node.kind == DisplayKind::Text);
        let snippet = match text {
            Some(node) => node.content.chars().take(MAX_SNIPPET_CHARS).collect(),
            None if nodes.iter().any(|node| node.kind == DisplayKind::Image) => {
                notices::IMAGE_SNIPPET.to_string()
            }
            None => String::new(),
        };
        Some(snippet)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn mail(id: &str, from: &str, day: u32, unread: bool) -> Mail {
        Mail {
            id: id.to_string(),
            subject: "subject".to_string(),
            from: from.to_string(),
            to: vec![from.to_string()],
            created: Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap(),
            message_id: format!("<{id}@x.com>"),
            unread,
            mime_content: None,
            warning: None,
            status: None,
            has_errors: None,
        }
    }

    fn thread_with(mails: Vec<Mail>) -> Thread {
        let mut thread = Thread::from_first_mail("t1", &mails[0]);
        for mail in mails {
            let id = mail.id.clone();
            thread.mails.push(mail);
            thread.summarize(&id);
        }
        thread
    }

    #[test]
    fn newest_mail_owns_summary() {
        let thread = thread_with(vec![
            mail("m2", "b@x.com", 2, false),
            mail("m1", "a@x.com", 1, true),
        ]);

        assert_eq!(thread.message_id, "<m2@x.com>");
        assert_eq!(thread.participants, ["b@x.com", "a@x.com"]);
        assert!(thread.unread);
        assert_eq!(thread.snippet, notices::INITIAL_SNIPPET);
    }

    #[test]
    fn snippet_prefers_text_then_image() {
        let mut thread = thread_with(vec![mail("m1", "a@x.com", 1, false)]);
        let long_text = "x".repeat(150);
        thread.mails[0].set_content(
            vec![
                DisplayNode::image("data:image/png;base64,AAAA", "image/png"),
                DisplayNode::text(long_text),
            ],
            None,
        );
        thread.summarize("m1");
        assert_eq!(thread.snippet.chars().count(), 100);

        thread.mails[0].set_content(
            vec![DisplayNode::image("data:image/png;base64,AAAA", "image/png")],
            None,
        );
        thread.summarize("m1");
        assert_eq!(thread.snippet, "image");
    }

    #[test]
    fn release_skips_mails_with_errors() {
        let mut thread = thread_with(vec![
            mail("m1", "a@x.com", 1, false),
            mail("m2", "a@x.com", 2, false),
        ]);
        thread.mails[0].set_content(vec![DisplayNode::text("hi")], None);
        thread.mails[1].mime_content = Some(vec![DisplayNode::text("partial")]);
        thread.mails[1].fail("broken");

        assert_eq!(thread.release_content(), 1);
        assert!(thread.mails[0].mime_content.is_none());
        assert!(thread.mails[1].mime_content.is_some());
    }
}
