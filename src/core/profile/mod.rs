//! User profiles, read-only from the marketplace's point of view.

pub mod profile_repository;
