//! Purchase requests from buyers and the seller's decision on them.

pub mod transaction_repository;
pub mod transaction_service;
