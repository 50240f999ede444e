//! Inform Agency - newspaper, topic and redactor management
//!
//! This library provides the core functionality behind the agency site:
//! storage, forms, services, templates and the HTTP layer.

pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod render;
pub mod services;
pub mod web;
