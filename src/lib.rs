pub mod common;
pub mod config;
pub mod jsonfile;
pub mod legacy;
pub mod selectel;
pub mod service;

pub use config::*;
