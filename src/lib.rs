//! Client-side data layer for the Rumbo SUP paddling conditions service.
//!
//! Fetches per-hour conditions timelines from the remote analysis service,
//! caches them per spot and profile, and exposes the pieces a front end
//! needs: wind safety classification, a durable rider profile, timeline
//! selection and a pull-to-refresh controller.

pub mod config;
pub mod errors;
pub mod helpers;
pub mod models;
pub mod services;
pub mod storage;

#[cfg(test)]
mod test_support;
