//! User-facing strings recorded on mails and threads.

pub const IMAGE_SNIPPET: &str = "image";
pub const INITIAL_SNIPPET: &str = "...";
pub const NO_SUBJECT: &str = "(no subject)";

const NO_KEYS_ERRORS: [&str; 2] = ["No keys found for message.", "No secret key"];

pub fn mime_error() -> String {
    "This part of the message could not be read".to_string()
}

pub fn unsupported_content(detail: &str) -> String {
    format!("Content not shown: {detail}")
}

pub fn sender_key_unavailable(sender: &str) -> String {
    format!("No public key is available for {sender}")
}

pub fn garbled_message() -> String {
    "The encrypted message is missing or garbled".to_string()
}

pub fn encoding_error() -> String {
    "The encrypted message has an invalid encoding".to_string()
}

pub fn fetching_message() -> String {
    "Fetching message".to_string()
}

pub fn checking_inbox() -> String {
    "Checking for new messages".to_string()
}

/// Maps a decrypt or verify failure to the text shown on the mail.
pub fn decrypt_failure(message: &str) -> String {
    if NO_KEYS_ERRORS.iter().any(|known| message.contains(known)) {
        return "This message was not encrypted for your key".to_string();
    }
    message.to_string()
}

pub fn pgp_mime_preamble() -> String {
    "This is an OpenPGP/MIME encrypted message (RFC 4880 and 3156)".to_string()
}

pub fn invite_subject(sender: &str) -> String {
    format!("{sender} would like to exchange encrypted mail with you")
}

pub fn invite_body(sender: &str) -> String {
    format!(
        "Hi,\r\n\r\n{sender} is using end-to-end encrypted mail and would like to send you private messages.\r\nInstall an OpenPGP capable mail client and publish your public key to get started.\r\n"
    )
}
