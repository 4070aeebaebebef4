pub mod bang;
pub mod config;
pub mod skin;
