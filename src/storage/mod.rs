pub mod db;
mod forums;
pub mod models;
mod props;
mod tables;
mod threads;

pub use db::{Database, DatabaseError, MetadataCapabilities, PurgeStats};
pub use tables::*;
