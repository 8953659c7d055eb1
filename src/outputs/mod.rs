pub mod history_view;
pub mod presenter;
pub mod router;

pub use history_view::{render_history, HistoryLine, HistoryView};
pub use presenter::{render, PrimaryAction, UiDescription};
pub use router::{Route, Router};
