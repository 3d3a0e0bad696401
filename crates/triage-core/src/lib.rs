pub mod cache;
pub mod command;
pub mod config;
pub mod model;
pub mod seek;
pub mod state;
