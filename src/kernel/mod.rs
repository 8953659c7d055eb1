pub mod effect;
pub mod event;
pub mod machine;
pub mod reactor;
pub mod state;
pub mod time;

pub use effect::SideEffect;
pub use event::Event;
pub use machine::{Machine, MachineConfig, Transition};
pub use reactor::{ResetHandle, SessionReactor};
pub use state::{Score, Session, SessionState};
pub use time::{Clock, ManualClock, Millis, SystemClock};
