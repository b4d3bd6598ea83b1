//! HTTP handlers for all web routes.

pub mod api;
pub mod chat;
pub mod forms;
pub mod pages;
