//! Piazza: a small community blogging platform.
//!
//! Users author posts, organize them into groups, comment, and follow other
//! authors. Pages are server-rendered; the home listing is served through a
//! short-lived response cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
