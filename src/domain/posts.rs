//! Validated inputs for post mutations.
//!
//! Callers construct these at the boundary; the content store trusts them and
//! never re-validates.

use super::error::DomainError;

const MAX_TITLE_CHARS: usize = 200;
const MAX_TAG_CHARS: usize = 64;

/// A post ready to be persisted together with its tag names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    title: String,
    content: String,
    owner_id: i64,
    tags: Vec<String>,
}

impl NewPost {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        owner_id: i64,
        tags: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, DomainError> {
        let title = validate_title(title.into())?;
        let content = validate_content(content.into())?;
        // Owners come from an authenticated principal, never from input.
        if owner_id <= 0 {
            return Err(DomainError::invariant("owner id must be positive"));
        }
        let tags = normalize_tags(tags)?;

        Ok(Self {
            title,
            content,
            owner_id,
            tags,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// The closed set of fields an owner may change on an existing post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    title: Option<String>,
    content: Option<String>,
}

impl PostPatch {
    pub fn new(title: Option<String>, content: Option<String>) -> Result<Self, DomainError> {
        let title = title.map(validate_title).transpose()?;
        let content = content.map(validate_content).transpose()?;
        if title.is_none() && content.is_none() {
            return Err(DomainError::validation(
                "update must change at least one of title or content",
            ));
        }
        Ok(Self { title, content })
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

/// Trims, drops empty entries and de-duplicates tag names, preserving the
/// first occurrence order.
pub fn normalize_tags(
    tags: impl IntoIterator<Item = impl AsRef<str>>,
) -> Result<Vec<String>, DomainError> {
    let mut names: Vec<String> = Vec::new();
    for raw in tags {
        let name = raw.as_ref().trim();
        if name.is_empty() {
            continue;
        }
        if name.chars().count() > MAX_TAG_CHARS {
            return Err(DomainError::validation(format!(
                "tag `{name}` exceeds {MAX_TAG_CHARS} characters"
            )));
        }
        if !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Splits a comma separated tag list as accepted by form-style clients.
pub fn split_tag_list(raw: &str) -> Vec<&str> {
    raw.split(',').collect()
}

pub fn validate_tag_name(raw: &str) -> Result<String, DomainError> {
    let mut names = normalize_tags([raw])?;
    names
        .pop()
        .ok_or_else(|| DomainError::validation("tag name must not be empty"))
}

fn validate_title(raw: String) -> Result<String, DomainError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(DomainError::validation("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(DomainError::validation(format!(
            "title exceeds {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_content(raw: String) -> Result<String, DomainError> {
    if raw.trim().is_empty() {
        return Err(DomainError::validation("content must not be empty"));
    }
    Ok(raw)
}
