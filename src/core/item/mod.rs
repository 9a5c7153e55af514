//! Item listings and their images.

pub mod image_repository;
pub mod image_store;
pub mod item_repository;
pub mod item_service;
pub mod item_status;
