pub mod client;
pub mod labels;
pub mod messages;
pub mod models;
pub mod transport;

pub use client::GmailClient;
pub use transport::{ApiResponse, HttpTransport, Transport};
