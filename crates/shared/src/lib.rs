//! Shared utilities and common types for the Gatherly backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic utilities (hashing, webhook signatures)
//! - Password hashing with Argon2id
//! - JWT token issuing and validation
//! - Pagination types
//! - Common validation logic

pub mod crypto;
pub mod jwt;
pub mod pagination;
pub mod password;
pub mod validation;
