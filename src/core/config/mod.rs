mod path;
pub mod record;
pub mod settings;
pub mod store;

pub use path::*;
