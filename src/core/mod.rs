pub mod channel;
pub mod config;
pub mod gamelist;
pub mod status;
