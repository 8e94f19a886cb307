pub mod db;
pub mod error;
pub mod export;
pub mod family;
pub mod models;
pub mod normalize;
pub mod service;
pub mod stats;
pub mod store;
