mod client;
mod config;

pub use client::QdrantVectorStore;
pub use config::{DEFAULT_COLLECTION, QdrantConfig};
