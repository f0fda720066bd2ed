pub mod align;
pub mod random;
pub mod stat;
