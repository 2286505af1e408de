use crate::{action::Action, draft::DocumentSnapshot};

/// The document being edited on the console. Produces the snapshots the
/// autosave engine watches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Editor {
    title: String,
    body: String,
    tags: Vec<String>,
}

impl Editor {
    pub fn load(snapshot: &DocumentSnapshot) -> Self {
        Self {
            title: snapshot.title.clone(),
            body: snapshot.body.clone(),
            tags: snapshot.tag_list().map(str::to_owned).collect(),
        }
    }

    /// Applies an edit. Returns whether the document changed.
    pub fn apply(&mut self, action: &Action) -> bool {
        let before = self.clone();
        match action {
            Action::SetTitle(title) => self.title.clone_from(title),
            Action::SetTags(tags) => {
                self.tags = tags
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_owned)
                    .collect();
            }
            Action::AppendBody(line) => {
                if !self.body.is_empty() {
                    self.body.push('\n');
                }
                self.body.push_str(line);
            }
            Action::ClearBody => self.body.clear(),
            _ => return false,
        }
        *self != before
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot::with_tags(&self.title, &self.body, &self.tags)
    }
}
