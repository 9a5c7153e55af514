//! Domain types, store traits and the services built on them.

pub mod block;
pub mod history;
pub mod item;
pub mod profile;
pub mod report;
pub mod repository;
pub mod review;
#[cfg(test)]
pub(crate) mod testing;
pub mod transaction;
