//! Resume export backend: the export job queue and its HTTP surface.

pub mod config;
pub mod db;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod routes;
pub mod state;
