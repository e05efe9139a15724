pub mod cache;
pub mod model;

pub use cache::RecentlyViewed;
pub use model::{Mail, Mailbox, Thread};
