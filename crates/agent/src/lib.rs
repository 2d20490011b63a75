//! Assurance agent: configuration and HTTP surface over the compliance pipeline

pub mod api;
pub mod config;
