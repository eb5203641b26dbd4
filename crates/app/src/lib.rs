//! HydraPro application layer
//!
//! Session and view control, the assistant client and the terminal front end,
//! on top of `hydra-core`.

pub mod assistant;
pub mod console;
pub mod state;
pub mod timer;
pub mod viewmodel;

pub use state::AppState;
pub use viewmodel::{Session, View};
