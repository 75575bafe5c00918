//! Membership Engine - payment-driven membership lifecycle.
//!
//! Assigns, cancels, pauses and expires memberships, keeps capability
//! grants in step with membership status, processes gateway webhooks
//! exactly once, and reconciles refunds against orders.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
