pub mod fetcher;
pub mod types;


pub use fetcher::{GitHubClient, SourceControlClient};
pub use types::{DiffDocument, DiffFetchError, DiffLine, DiffLineKind, FileDiff, Repository};
