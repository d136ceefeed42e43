pub mod clock;
pub mod folder;
pub mod graph;
pub mod metrics;
pub mod output;
pub mod path_builder;
pub mod sanitize;
pub mod scanner;
pub mod storage;
pub mod strftime;
pub mod template;
