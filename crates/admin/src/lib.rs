//! RAZE admin library.
//!
//! This crate provides the back-office API as a library, allowing it to be
//! tested and reused by the CLI.
//!
//! # Security
//!
//! This crate has HIGH PRIVILEGE access:
//! - Read and write access to every shop table
//! - Staff account management
//!
//! Only deploy behind the private network; the API is never exposed to
//! shop customers.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
