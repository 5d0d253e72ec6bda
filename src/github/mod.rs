//! GitHub integration for fetching commit history without a local checkout.

pub mod api_client;

pub use api_client::{GitHubClient, RepoSlug};
