/// System label carried by every inbox message.
pub const INBOX: &str = "INBOX";
/// System label marking a message unread.
pub const UNREAD: &str = "UNREAD";
/// Label `type` value for labels the user created.
pub const USER_LABEL_TYPE: &str = "user";

pub fn list_labels_endpoint() -> &'static str {
    "/gmail/v1/users/me/labels"
}

pub fn modify_message_endpoint(id: &str) -> String {
    format!("/gmail/v1/users/me/messages/{id}/modify")
}

pub fn modify_thread_endpoint(id: &str) -> String {
    format!("/gmail/v1/users/me/threads/{id}/modify")
}
