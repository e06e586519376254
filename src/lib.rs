#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod graph;
pub mod layout;
pub mod render;
pub mod source;

#[cfg(feature = "cli")]
pub use cli::run;
