pub mod app;
pub mod assistant;
pub mod catalog;
pub mod config;
pub mod decode;
pub mod models;
pub mod search;
pub mod storage;
pub mod store;
pub mod transfer;
