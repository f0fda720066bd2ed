pub mod error;
pub mod node;
pub mod parser;
pub mod tree;

pub use error::TreeError;
pub use node::{FragNode, NodeId};
pub use tree::FragTree;
