use crate::libs::formula::Formula;

/// NodeId is an index into the FragTree's node vector.
pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct FragNode {
    /// Index in the arena
    pub id: NodeId,

    /// Parent node ID (None for root)
    pub parent: Option<NodeId>,

    /// Ordered child node IDs
    pub children: Vec<NodeId>,

    // --- Payload ---

    /// Neutral loss on the edge from the parent into this node.
    /// The root has none.
    pub loss: Option<Formula>,

    /// Peak explanation of this fragment
    pub fragment: Option<Formula>,

    /// Node weight, used by weighted scoring
    pub weight: f64,

    /// Optional display name
    pub name: Option<String>,
}

impl FragNode {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            loss: None,
            fragment: None,
            weight: 0.0,
            name: None,
        }
    }

    pub fn with_loss(mut self, loss: Formula) -> Self {
        self.loss = Some(loss);
        self
    }

    pub fn with_fragment(mut self, fragment: Formula) -> Self {
        self.fragment = Some(fragment);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn degree(&self) -> usize {
        self.children.len()
    }

    /// Loss label for display; `-` when absent
    pub fn loss_label(&self) -> String {
        match &self.loss {
            Some(f) => f.to_string(),
            None => "-".to_string(),
        }
    }
}
