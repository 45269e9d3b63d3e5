//! Community API client for the saved-query migration tool.
//!
//! This crate is the single source of truth for the wire contract:
//! request signing, the signed transport, and the typed response shapes
//! for version, saved-query list, create and delete.
//!
//! No console output. No retries. No exit codes.

mod auth;
mod client;
mod signer;

pub use auth::Credentials;
pub use client::{
    ApiResponse, ApiVersion, Client, ClientError, Clock, NewSavedQuery, QueryId, SavedQuery,
    SAVED_QUERIES_PATH, VERSION_PATH,
};
pub use signer::{
    request_timestamp, sign, SignedHeaders, HEADER_REQUEST_DATE, HEADER_SIGNATURE,
    SIGNATURE_SCHEME, USER_AGENT,
};

pub use reqwest::Method;
