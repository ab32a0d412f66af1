//! Supabase adapters for the auth and profile ports (GoTrue + PostgREST).

mod auth_client;
mod dto;
mod http;
mod profile_store;

pub use auth_client::SupabaseAuthClient;
pub use profile_store::{AccessTokenSource, SupabaseProfileStore};
