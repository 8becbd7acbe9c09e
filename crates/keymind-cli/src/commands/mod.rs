pub mod config;
#[cfg(unix)]
pub mod daemon;
pub mod run;
