//! Google Photos Library API: OAuth credentials, listing and downloads.

pub mod auth;
pub mod client;
mod models;

pub use auth::{Authenticator, ClientSecrets, Token, TokenSource, TokenStore};
pub use client::{GooglePhotos, http_client};
