pub mod walk;

pub use walk::{traverse, TraverseFailure, TraverseOptions, Traversal};
