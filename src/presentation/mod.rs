//! Template rendering and view models.

pub mod views;
