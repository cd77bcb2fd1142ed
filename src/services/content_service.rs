use std::path::{Component, Path, PathBuf};

use tokio::fs;

use crate::error::{Error, Result};
use crate::models::document::DocContent;

#[derive(Clone)]
pub struct ContentService {
    root: PathBuf,
}

impl ContentService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Loads a documentation page by its site path (`networking/osi` or
    /// `networking/osi.mdx`). Tries `<path>.mdx`, then `<path>/index.mdx`.
    pub async fn load(&self, file_path: &str) -> Result<DocContent> {
        let relative = normalize_doc_path(file_path)?;
        let candidates = [
            self.root.join(format!("{}.mdx", relative)),
            self.root.join(&relative).join("index.mdx"),
        ];

        for candidate in &candidates {
            match fs::read_to_string(candidate).await {
                Ok(raw) => {
                    tracing::debug!(path = %candidate.display(), "Document loaded");
                    let (title, description, content) = split_frontmatter(&raw);
                    return Ok(DocContent {
                        title,
                        description,
                        content,
                        file_path: candidate
                            .strip_prefix(&self.root)
                            .unwrap_or(candidate)
                            .to_string_lossy()
                            .into_owned(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::NotFound(format!("Document not found: {}", file_path)))
    }
}

fn normalize_doc_path(file_path: &str) -> Result<String> {
    let mut trimmed = file_path.trim().trim_start_matches('/');
    while let Some(rest) = trimmed
        .strip_prefix("../")
        .or_else(move || trimmed.strip_prefix("..\\"))
    {
        trimmed = rest;
    }
    let trimmed = trimmed.strip_suffix(".mdx").unwrap_or(trimmed);

    if trimmed.is_empty() {
        return Err(Error::BadRequest("Missing file path".to_string()));
    }
    let clean = Path::new(trimmed)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !clean {
        return Err(Error::BadRequest(format!("Invalid file path: {}", file_path)));
    }
    Ok(trimmed.to_string())
}

/// Splits `---` frontmatter off a document. Returns title, description and
/// the trimmed body.
fn split_frontmatter(raw: &str) -> (String, String, String) {
    let normalized = raw.replace("\r\n", "\n");
    let Some(after_open) = normalized.trim_start().strip_prefix("---\n") else {
        return (String::new(), String::new(), normalized.trim().to_string());
    };
    let Some(end) = after_open.find("\n---") else {
        return (String::new(), String::new(), normalized.trim().to_string());
    };

    let frontmatter = &after_open[..end];
    let body = after_open[end + 4..].trim().to_string();
    (
        frontmatter_value(frontmatter, "title"),
        frontmatter_value(frontmatter, "description"),
        body,
    )
}

fn frontmatter_value(frontmatter: &str, key: &str) -> String {
    frontmatter
        .lines()
        .find_map(|line| {
            let (k, v) = line.split_once(':')?;
            (k.trim() == key).then(|| unquote(v.trim()).to_string())
        })
        .unwrap_or_default()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
