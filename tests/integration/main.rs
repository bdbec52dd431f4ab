//! Integration tests for Aisle-Sweep
//!
//! These tests use wiremock to serve retailer listing pages and exercise the
//! crawler end-to-end over real HTTP.

mod common;
mod fetch_tests;
mod sweep_tests;
