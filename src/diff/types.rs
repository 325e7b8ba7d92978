use crate::error::ApiError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineKind {
    Add,
    Del,
    Context,
}

/// One changed or surrounding line. `line_number` is the new-file number for
/// added/context lines and the old-file number for deletions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub content: String,
    pub line_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    pub file_name: String,
    pub lines: Vec<DiffLine>,
}

/// The unified diff of one commit, owned by the request that fetched it.
/// Never cached or shared across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffDocument {
    pub commit_ref: String,
    pub files: Vec<FileDiff>,
}

impl DiffDocument {
    /// Parse raw unified-diff text as returned by the source host.
    ///
    /// File boundaries come from `diff --git` headers, line numbers from
    /// `@@` hunk headers. Metadata lines (index, mode, `---`/`+++`) are not
    /// part of the document.
    pub fn parse(commit_ref: impl Into<String>, raw: &str) -> Self {
        let mut files: Vec<FileDiff> = Vec::new();
        let mut old_line: u32 = 0;
        let mut new_line: u32 = 0;
        let mut in_hunk = false;

        for line in raw.lines() {
            if let Some(header) = line.strip_prefix("diff --git ") {
                files.push(FileDiff {
                    file_name: file_name_from_header(header),
                    lines: Vec::new(),
                });
                in_hunk = false;
                continue;
            }

            if line.starts_with("@@") {
                if let Some((old_start, new_start)) = parse_hunk_header(line) {
                    old_line = old_start;
                    new_line = new_start;
                    in_hunk = true;
                }
                continue;
            }

            if !in_hunk {
                continue;
            }

            let Some(current) = files.last_mut() else {
                continue;
            };

            if let Some(content) = line.strip_prefix('+') {
                current.lines.push(DiffLine {
                    kind: DiffLineKind::Add,
                    content: content.to_string(),
                    line_number: new_line,
                });
                new_line += 1;
            } else if let Some(content) = line.strip_prefix('-') {
                current.lines.push(DiffLine {
                    kind: DiffLineKind::Del,
                    content: content.to_string(),
                    line_number: old_line,
                });
                old_line += 1;
            } else if line.starts_with('\\') {
                // "\ No newline at end of file"
            } else {
                let content = line.strip_prefix(' ').unwrap_or(line);
                current.lines.push(DiffLine {
                    kind: DiffLineKind::Context,
                    content: content.to_string(),
                    line_number: new_line,
                });
                old_line += 1;
                new_line += 1;
            }
        }

        Self {
            commit_ref: commit_ref.into(),
            files,
        }
    }

    pub fn line_count(&self) -> usize {
        self.files.iter().map(|f| f.lines.len()).sum()
    }

    /// Render the diff for prompt inclusion, truncated at `max_chars` so an
    /// oversized commit cannot blow the generation context.
    pub fn render(&self, max_chars: usize) -> String {
        let mut out = String::new();
        'outer: for file in &self.files {
            out.push_str("--- ");
            out.push_str(&file.file_name);
            out.push('\n');
            for line in &file.lines {
                let marker = match line.kind {
                    DiffLineKind::Add => '+',
                    DiffLineKind::Del => '-',
                    DiffLineKind::Context => ' ',
                };
                out.push(marker);
                out.push_str(&line.content);
                out.push('\n');
                if out.len() >= max_chars {
                    out.truncate(max_chars);
                    out.push_str("\n[diff truncated]\n");
                    break 'outer;
                }
            }
        }
        out
    }
}

fn file_name_from_header(header: &str) -> String {
    // "a/old_path b/new_path" -- the new path names the file.
    header
        .split_whitespace()
        .last()
        .map(|token| token.strip_prefix("b/").unwrap_or(token))
        .unwrap_or(header)
        .to_string()
}

fn parse_hunk_header(line: &str) -> Option<(u32, u32)> {
    // "@@ -old_start,old_len +new_start,new_len @@ ..."
    let mut old_start = None;
    let mut new_start = None;
    for token in line.split_whitespace() {
        if old_start.is_none()
            && let Some(spec) = token.strip_prefix('-')
        {
            old_start = spec.split(',').next()?.parse().ok();
        } else if new_start.is_none()
            && let Some(spec) = token.strip_prefix('+')
        {
            new_start = spec.split(',').next()?.parse().ok();
        }
        if old_start.is_some() && new_start.is_some() {
            break;
        }
    }
    Some((old_start?, new_start?))
}

/// A repository visible to the authenticated identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub private: bool,
}

/// Failures at the source-control boundary, translated into the shared
/// taxonomy before they reach a client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiffFetchError {
    #[error("source-control credential rejected")]
    Unauthorized,
    #[error("{resource} not found")]
    NotFound { resource: String },
    #[error("source-control API rate limited")]
    UpstreamRateLimited { retry_after_secs: Option<u64> },
    #[error("source-control API unavailable: {message}")]
    UpstreamUnavailable { message: String },
}

impl From<DiffFetchError> for ApiError {
    fn from(err: DiffFetchError) -> Self {
        match err {
            DiffFetchError::NotFound { resource } => ApiError::NotFound { resource },
            DiffFetchError::Unauthorized => ApiError::external(
                "source-control",
                "commit diff",
                "credential rejected by the source host",
            ),
            DiffFetchError::UpstreamRateLimited { retry_after_secs } => ApiError::external(
                "source-control",
                "commit diff",
                match retry_after_secs {
                    Some(secs) => format!("upstream rate limited, retry in {secs}s"),
                    None => "upstream rate limited".to_string(),
                },
            ),
            DiffFetchError::UpstreamUnavailable { message } => {
                ApiError::external("source-control", "commit diff", message)
            }
        }
    }
}
