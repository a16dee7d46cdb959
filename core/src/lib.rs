//! Blocking client for the lemlist campaign API.
//!
//! # Overview
//! `Campaigns` exposes campaign and lead operations on top of a `Gateway`,
//! which authenticates, sends, and decodes every request. Sending goes
//! through the `Transport` trait, so tests can swap the network for canned
//! responses.
//!
//! # Design
//! - The `Authorization` header is derived from the API key on every request;
//!   there is no session state.
//! - Success bodies are decoded as JSON when possible and returned as raw text
//!   otherwise (`Payload`). Non-success statuses become `ApiError::HttpError`
//!   and are never retried here.
//! - The CSV lead export is normalized into `LeadExportRecord`s with a content
//!   hash that ignores `emailStatus`.

pub mod auth;
pub mod campaigns;
pub mod config;
pub mod error;
pub mod export;
pub mod gateway;
pub mod http;
pub mod types;

#[cfg(test)]
mod test_support;

pub use auth::authorization_header;
pub use campaigns::Campaigns;
pub use config::ClientConfig;
pub use error::ApiError;
pub use export::{normalize_export, LeadExportRecord};
pub use gateway::{Gateway, Payload, DEFAULT_BASE_URL};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use types::{AddLeadOptions, Lead};
