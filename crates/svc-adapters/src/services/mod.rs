pub mod order;
pub mod word;
