mod app;
mod cli;
mod config;
mod effects;
mod logging;
mod persistence;
mod ui;

pub use cli::run;
