pub mod config;
pub mod error;
pub mod graph;
pub mod job;
pub mod preset;
pub mod settings;
pub mod state;
pub mod theme;
pub mod types;

mod serde_tests;
