pub mod campaign;
pub mod config;
pub mod models;
pub mod storage;
