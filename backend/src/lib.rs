//! # FleetCrew Blog Backend
//!
//! Content, audience and engagement backend for a fleet-management blog.
//!
//! This crate stores articles, categories and tags, collects newsletter
//! subscriptions and contact messages, and records reader engagement
//! (page views with read progress, likes). It exposes a JSON API via Axum
//! for the single-page client, together with an RSS feed, a sitemap and an
//! API-key protected endpoint for scheduled publishing.
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Domain records and request payloads shared by every layer
//! - [`db`]: Repository traits, Postgres and in-memory backends, service layer
//! - [`content`]: Slugs, headings and read-time helpers
//! - [`feeds`]: RSS, sitemap and robots.txt rendering
//! - [`auth`]: Session tokens and constant-time key checks
//! - [`config`]: Server and site configuration
//! - [`images`]: Cover-image generation client
//! - [`http`]: Axum-based HTTP server and request handlers
//!

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;

pub mod auth;
pub mod config;
pub mod content;
pub mod db;
pub mod feeds;
pub mod images;
pub mod models;

#[cfg(feature = "http-server")]
pub mod http;
