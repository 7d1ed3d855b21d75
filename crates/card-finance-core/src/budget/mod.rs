pub mod debounce;
pub mod simulation;
pub mod tracker;
