pub mod account;
pub mod order;
pub mod quote;

pub use account::*;
pub use order::*;
pub use quote::*;
