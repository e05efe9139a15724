use chrono::{DateTime, Utc};
use mailparse::{MailAddr, addrparse, dateparse};
use tracing::{debug, trace};

use crate::api::models::MessageResource;
use crate::contacts::{Contacts, DEFAULT_PRIORITY, OWNER_PRIORITY};
use crate::mailbox::{Mail, Mailbox, Thread};
use crate::notices;

/// Metadata of one message that passed the candidate checks.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexableMessage {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub from: String,
    pub recipients: Vec<String>,
    pub created: DateTime<Utc>,
    pub message_id: String,
    pub unread: bool,
}

impl IndexableMessage {
    /// Validates a metadata response once. Any missing or unparsable
    /// required header yields `None`.
    pub fn from_resource(resource: &MessageResource) -> Option<Self> {
        let thread_id = resource.thread_id.clone()?;
        resource.header("Content-Type")?;
        let message_id = resource.header("Message-ID")?.trim().to_string();
        let created = parse_date(resource.header("Date")?)?;
        let from = parse_addresses(resource.header("From")?).into_iter().next()?;

        let mut recipients = vec![from.clone()];
        for header in ["To", "Cc"] {
            for address in resource.header(header).map(parse_addresses).unwrap_or_default() {
                if !recipients.contains(&address) {
                    recipients.push(address);
                }
            }
        }

        let subject = resource
            .header("Subject")
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| notices::NO_SUBJECT.to_string());

        Some(Self {
            id: resource.id.clone(),
            thread_id,
            subject,
            from,
            recipients,
            created,
            message_id,
            unread: resource.is_unread(),
        })
    }

    fn to_mail(&self) -> Mail {
        Mail {
            id: self.id.clone(),
            subject: self.subject.clone(),
            from: self.from.clone(),
            to: self.recipients.clone(),
            created: self.created,
            message_id: self.message_id.clone(),
            unread: self.unread,
            mime_content: None,
            warning: None,
            status: None,
            has_errors: None,
        }
    }
}

/// Merges one metadata response into the mailbox. Returns `false` when the
/// message was skipped or was already indexed.
pub fn index_message(mailbox: &mut Mailbox, contacts: &dyn Contacts, resource: &MessageResource) -> bool {
    let Some(message) = IndexableMessage::from_resource(resource) else {
        trace!(id = %resource.id, "skipping message without pgp/mime metadata");
        return false;
    };

    let mail = message.to_mail();
    let position = match mailbox.threads.iter().position(|thread| thread.id == message.thread_id) {
        Some(position) => position,
        None => {
            mailbox
                .threads
                .push(Thread::from_first_mail(&message.thread_id, &mail));
            mailbox.threads.len() - 1
        }
    };

    let thread = &mut mailbox.threads[position];
    if thread.contains_mail(&message.id) {
        return false;
    }

    debug!(id = %message.id, thread = %message.thread_id, "indexed message");
    thread.mails.push(mail);
    thread.summarize(&message.id);

    let priority = if message.from.eq_ignore_ascii_case(&mailbox.email) {
        OWNER_PRIORITY
    } else {
        DEFAULT_PRIORITY
    };
    contacts.add_candidate(&message.from, priority);
    for recipient in &message.recipients {
        contacts.add_candidate(recipient, priority);
    }

    true
}

/// Bare addresses from an address-list header, in order.
pub fn parse_addresses(header: &str) -> Vec<String> {
    let Ok(list) = addrparse(header) else {
        return Vec::new();
    };

    list.iter()
        .flat_map(|entry| match entry {
            MailAddr::Single(single) => vec![single.addr.clone()],
            MailAddr::Group(group) => group.addrs.iter().map(|single| single.addr.clone()).collect(),
        })
        .filter(|address| address.contains('@'))
        .collect()
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let timestamp = dateparse(value).ok()?;
    DateTime::from_timestamp(timestamp, 0)
}
