mod basic;
mod lock;

pub use basic::*;
pub use lock::*;
