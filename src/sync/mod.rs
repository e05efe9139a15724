//! Mailbox synchronisation: inbox scanning, metadata indexing, on-demand
//! decryption and the send pipeline, all driven through a [`Session`].

pub mod decryptor;
pub mod indexer;
pub mod labels;
pub mod scanner;
pub mod send;
pub mod session;

pub use indexer::IndexableMessage;
pub use scanner::InboxScanner;
pub use send::OutgoingMail;
pub use session::Session;
