use crate::libs::fragtree::TreeError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum AlignError {
    /// A node has more children than exact subset enumeration allows
    TooBushy {
        /// Out-degree of the offending node
        degree: usize,
        /// Configured bound
        limit: usize,
    },
    /// Invalid tree input or restructuring
    Tree(TreeError),
    /// Inconsistent configuration or internal state
    Logic(String),
}

impl fmt::Display for AlignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignError::TooBushy { degree, limit } => write!(
                f,
                "Tree branching too wide for exact alignment: degree {} exceeds limit {}",
                degree, limit
            ),
            AlignError::Tree(e) => write!(f, "{}", e),
            AlignError::Logic(msg) => write!(f, "Alignment error: {}", msg),
        }
    }
}

impl std::error::Error for AlignError {}

impl From<TreeError> for AlignError {
    fn from(e: TreeError) -> Self {
        AlignError::Tree(e)
    }
}
