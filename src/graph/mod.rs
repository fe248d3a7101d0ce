pub mod builder;
pub mod traversal;
pub mod types;

pub use builder::PathGraph;
pub use types::EdgeData;
