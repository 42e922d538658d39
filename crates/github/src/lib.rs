//! Typed access to the GitHub REST API.
//!
//! [`GitHubGateway`] implements [`RepositorySource`], the seam the analysis
//! pipeline depends on. Tests substitute their own sources.

mod gateway;
mod types;

pub use gateway::{
    decode_base64_content, GitHubGateway, RepositorySource, DEFAULT_API_BASE, DEFAULT_PAGE_SIZE,
    GITHUB_SERVICE,
};
pub use types::{
    CommitSummary, ContentEntry, Contributor, EntryKind, IdentityError, IssueState, IssueSummary,
    RepoFileEntry, RepoMetadata, RepositoryIdentity,
};
