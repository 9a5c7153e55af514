//! Profiles hiding other profiles.

pub mod block_repository;
pub mod block_service;
