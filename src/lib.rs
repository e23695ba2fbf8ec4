pub mod cli;
pub mod client;
pub mod errors;
pub mod models;
pub mod tracker;
