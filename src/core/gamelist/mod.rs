pub mod editor;
mod store;

pub use editor::{EditSession, apply_filter, begin_edit, merge, to_persisted};
pub use store::GameListStore;
