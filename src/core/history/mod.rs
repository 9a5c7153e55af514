//! Per-profile search history.

pub mod history_repository;
pub mod history_service;
