pub mod catalog;
pub mod config;
pub mod matcher;
pub mod notify;
pub mod parser;
pub mod placer;
pub mod renamer;
