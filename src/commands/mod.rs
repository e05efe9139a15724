pub mod auth;
pub mod contacts;
pub mod invite;
pub mod read;
pub mod send;
pub mod threads;
pub mod trash;
