use serde::{Deserialize, Serialize};

const TAG_SEPARATOR: &str = ", ";

/// Immutable value of everything the editor lets the user change on a draft.
///
/// Tags are kept as one canonical joined string, so structural equality of two
/// snapshots is plain field equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub title: String,
    pub body: String,
    pub tags: String,
}

impl DocumentSnapshot {
    pub fn new(title: impl Into<String>, body: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tags: tags.into(),
        }
    }

    /// Builds a snapshot from individual tags, joining them canonically.
    pub fn with_tags<I, S>(title: impl Into<String>, body: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(title, body, join_tags(tags))
    }

    /// All three fields empty, i.e. the baseline of a fresh editor.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.body.is_empty() && self.tags.is_empty()
    }

    /// Whether there is anything worth persisting automatically.
    ///
    /// Tags alone don't count.
    pub fn has_content(&self) -> bool {
        !self.title.is_empty() || !self.body.is_empty()
    }

    pub fn tag_list(&self) -> impl Iterator<Item = &str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }
}

pub(crate) fn join_tags<I, S>(tags: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            joined.push_str(TAG_SEPARATOR);
        }
        joined.push_str(tag);
    }
    joined
}
