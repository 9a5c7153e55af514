//! A second-hand marketplace service built with axum.
//!
//! Sellers list items with images, buyers request purchases, sellers confirm
//! one request per item, and both sides leave reviews. Profiles can report or
//! block each other, and searches are remembered per profile.

pub mod api;
pub mod app;
pub mod core;
pub mod infra;
