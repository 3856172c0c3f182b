pub mod structs;
pub mod units;

pub use structs::TokenAmount;
