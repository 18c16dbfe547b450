//! Pricing rules and stay constraints for multi-tenant campground
//! reservations.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
