pub mod checkpoint;
pub mod classify;
pub mod cli;
pub mod config;
pub mod ctx;
pub mod error;
pub mod fetch;
pub mod io;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod session;
pub mod source;
