//! Shared data layer for the dating platform's backend services.
//!
//! Every service binary (`gateway`, `auth-service`, `profile-service`,
//! `discovery-service`, `chat-service`, `notification-relay`) depends on
//! this crate for configuration loading, the HTTP error taxonomy,
//! database pooling and migrations, domain models, repositories, bearer
//! token minting/verification, Telegram `initData` validation, request
//! id generation, and the idempotency cache. None of these concerns are
//! duplicated per-service.

#![forbid(unsafe_code)]

/// Shared bearer-token `axum` extractor (§4.2).
pub mod auth;
/// Process-wide configuration, loaded from the environment (§6.4).
pub mod config;
/// Database pool construction and leader-elected migrations (§4.7).
pub mod db;
/// Stable error taxonomy shared by every HTTP surface (§6.1, §7).
pub mod error;
/// Geohashing and distance helpers used by discovery ranking.
pub mod geo;
/// Bounded, TTL-evicting idempotency cache (§5).
pub mod idempotency;
/// Bearer token minting and verification (§4.2).
pub mod jwt;
/// Structured logging setup shared by every binary.
pub mod logging;
/// Domain entities (§3).
pub mod models;
/// Hand-written repository queries over the domain entities.
pub mod repo;
/// Telegram WebApp `initData` HMAC verification (§4.2).
pub mod telegram_init_data;

pub use error::ApiError;
