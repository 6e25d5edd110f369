//! HTTP [`nocturne_core::sync::RemoteStore`] backed by the REST document API.

pub mod client;
pub mod error;
pub mod types;

pub use client::HttpRemoteStore;
pub use error::{ApiRetryClass, RemoteHttpError};
