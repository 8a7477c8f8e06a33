//! HTTP request handlers

pub mod clone;
pub mod health;
