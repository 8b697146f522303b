//! Invitation tree view: a cached snapshot of the forest plus its
//! membership statistics and a plain-text outline.

pub mod cache;
pub mod render;
pub mod view;

pub use cache::ForestCache;
pub use view::{TreeView, TreeViewError};
