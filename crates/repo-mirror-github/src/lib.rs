pub mod blob;
pub mod client;
pub mod content;
pub mod tree;

pub use client::{GitHubClient, GitHubConfig};
