pub mod compose;
pub mod mime;

pub use compose::{Envelope, build_pgp_mime, build_plaintext_mime, encode_raw, mailbox_address};
pub use mime::{DisplayKind, DisplayNode, MimeBody, MimeNode};
