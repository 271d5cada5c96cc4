//! Core module - configuration, events, and settings

pub mod config;
pub mod events;
pub mod settings;
