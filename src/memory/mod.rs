pub mod history;
pub mod store;

pub use history::*;
pub use store::*;
