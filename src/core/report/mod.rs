//! Reports about misbehaving profiles.

pub mod report_repository;
pub mod report_service;
