pub mod commands;
pub mod config;
pub mod geoloc;
pub mod insight;
pub mod models;
pub mod report;
pub mod storage;
pub mod telegraph;
