pub mod app;
pub mod cache;
pub mod config;
pub mod filter;
pub mod gateway;
pub mod item;
pub mod repo;
pub mod results;
pub mod selection;
pub mod viewport;
