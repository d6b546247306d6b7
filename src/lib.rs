// Library exports for logtarget

pub mod cli;
pub mod config;
pub mod error;
pub mod logs;
