//! CLI command implementations.

mod align;
mod captions;
mod compare;
mod config;
mod doctor;

pub use align::run_align;
pub use captions::run_captions;
pub use compare::{run_compare, CompareArgs};
pub use config::run_config;
pub use doctor::run_doctor;
