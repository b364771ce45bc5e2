//! Command implementations for xtask
//!
//! Each command is a separate module that implements its own CLI args and execution logic.

mod check_content;
mod compare_stores;
mod read_store;

pub use check_content::CheckContent;
pub use compare_stores::CompareStores;
pub use read_store::ReadStore;
