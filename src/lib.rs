pub mod config;
pub mod domain;
pub mod scheduler;
pub mod services;
pub mod settings;
pub mod storage;
pub mod utils;
