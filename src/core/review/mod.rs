//! Ratings buyers leave after a confirmed purchase.

pub mod review_repository;
pub mod review_service;
