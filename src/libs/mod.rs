pub mod align;
pub mod formula;
pub mod fragtree;
