//! Application services layer.

pub mod comments;
pub mod error;
pub mod follows;
pub mod listing;
pub mod pagination;
pub mod posts;
pub mod profile;
pub mod repos;
