pub mod alerts;
pub mod config;
pub mod db;
pub mod evaluators;
pub mod kafka;
pub mod models;
pub mod processor;
