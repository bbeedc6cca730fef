// src/router/mod.rs
mod priority;
mod selector;

pub use priority::PriorityRouter;
pub use selector::ServiceSelector;
