pub mod config;
pub mod models;
pub mod parse;
pub mod problem;
pub mod report;
pub mod sensitivity;

pub use config::Config;
pub use problem::Problem;
