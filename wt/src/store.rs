//! Persistent todo list backed by a JSON file in the workspace
//!
//! The store file is a pretty-printed JSON array of [`TodoItem`]s. Loading is
//! lenient: malformed entries are dropped instead of failing the read. Saving
//! is strict: the whole list is rewritten through a temp file and a rename.
//!
//! Ids are never reused. The highest id ever allocated is remembered in a
//! sidecar file next to the store (`<store>.next-id`), so removing the newest
//! items does not hand their ids out again.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::tools::write_atomic;

/// Lifecycle state of a todo item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl TodoStatus {
    /// Parse a status name; unknown names yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    fn from_value(value: Option<&Value>) -> Option<Self> {
        value.and_then(Value::as_str).and_then(Self::parse)
    }
}

/// A single entry in the todo list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: i64,
    pub content: String,
    pub status: TodoStatus,
}

/// Errors from loading or saving the todo store
#[derive(Debug, Error)]
pub enum TodoStoreError {
    #[error("path is not a file: {}", path.display())]
    NotAFile { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("todo store must be a list, got {kind}")]
    NotAList { kind: &'static str },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no todo ids left to allocate")]
    IdsExhausted,

    #[error("failed to serialize todo list: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// In-memory todo list plus the next id to allocate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoList {
    items: Vec<TodoItem>,
    next_id: i64,
}

impl Default for TodoList {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
        }
    }
}

impl TodoList {
    /// Items sorted by id
    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    pub fn next_id(&self) -> i64 {
        self.next_id
    }

    /// Append each draft `{content, status?}` with non-blank string content
    ///
    /// Content is trimmed; a missing or unknown status becomes `pending`.
    /// Returns the number of items added. Nothing is added if the id space
    /// runs out partway through the batch.
    pub fn add(&mut self, drafts: &[Value]) -> Result<usize, TodoStoreError> {
        let mut next_id = self.next_id;
        let mut fresh = Vec::new();
        for draft in drafts {
            let Some(content) = draft.get("content").and_then(Value::as_str).map(str::trim) else {
                continue;
            };
            if content.is_empty() {
                continue;
            }
            // The id after this one must exist too, or the high-water mark could not advance
            let following = next_id.checked_add(1).ok_or(TodoStoreError::IdsExhausted)?;
            let status = TodoStatus::from_value(draft.get("status")).unwrap_or_default();
            fresh.push(TodoItem {
                id: next_id,
                content: content.to_string(),
                status,
            });
            debug!(id = next_id, "TodoList::add: allocated id");
            next_id = following;
        }

        let added = fresh.len();
        self.items.extend(fresh);
        self.items.sort_by_key(|item| item.id);
        self.next_id = next_id;
        Ok(added)
    }

    /// Apply `{id, content?, status?}` patches to existing items
    ///
    /// A patch naming an existing id counts as applied even when neither field
    /// is valid. Unknown ids are skipped. Returns the number applied.
    pub fn update(&mut self, patches: &[Value]) -> usize {
        let mut updated = 0;
        for patch in patches {
            let Some(id) = patch.get("id").and_then(Value::as_i64) else {
                continue;
            };
            let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
                debug!(%id, "TodoList::update: unknown id, skipping");
                continue;
            };
            if let Some(content) = patch.get("content").and_then(Value::as_str).map(str::trim) {
                if !content.is_empty() {
                    item.content = content.to_string();
                }
            }
            if let Some(status) = TodoStatus::from_value(patch.get("status")) {
                item.status = status;
            }
            updated += 1;
        }
        updated
    }

    /// Delete items whose id is in `ids`; returns the number removed
    pub fn remove(&mut self, ids: &HashSet<i64>) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !ids.contains(&item.id));
        before - self.items.len()
    }

    /// Drop every item; allocated ids stay retired
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// JSON-file todo store at a fixed path
#[derive(Debug, Clone)]
pub struct TodoStore {
    path: PathBuf,
}

impl TodoStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn next_id_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.path.with_file_name(format!("{}.next-id", name))
    }

    /// Load the list; a missing store file is an empty list
    pub fn load(&self) -> Result<TodoList, TodoStoreError> {
        debug!(path = ?self.path, "TodoStore::load: called");
        if !self.path.exists() {
            debug!("TodoStore::load: no store file yet");
            return Ok(TodoList {
                items: Vec::new(),
                next_id: self.recorded_next_id().unwrap_or(1).max(1),
            });
        }
        if !self.path.is_file() {
            return Err(TodoStoreError::NotAFile { path: self.path.clone() });
        }

        let raw = fs::read_to_string(&self.path).map_err(|source| TodoStoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        let data: Value = serde_json::from_str(&raw).map_err(|source| TodoStoreError::InvalidJson {
            path: self.path.clone(),
            source,
        })?;
        let entries = match data {
            Value::Array(entries) => entries,
            other => {
                return Err(TodoStoreError::NotAList {
                    kind: json_kind(&other),
                });
            }
        };

        let total = entries.len();
        let mut items: Vec<TodoItem> = entries.iter().filter_map(parse_stored_item).collect();
        items.sort_by_key(|item| item.id);
        items.dedup_by_key(|item| item.id);
        if items.len() != total {
            warn!(dropped = total - items.len(), "TodoStore::load: dropped malformed entries");
        }

        let after_max = items.last().map(|item| item.id + 1).unwrap_or(1);
        let next_id = self.recorded_next_id().map_or(after_max, |recorded| recorded.max(after_max));
        debug!(count = items.len(), %next_id, "TodoStore::load: loaded");
        Ok(TodoList { items, next_id })
    }

    /// Persist the list, all-or-nothing
    pub fn save(&self, list: &TodoList) -> Result<(), TodoStoreError> {
        debug!(path = ?self.path, count = list.items.len(), "TodoStore::save: called");
        let json = serde_json::to_string_pretty(&list.items)?;

        // Record the id high-water mark first so a crash in between can only skip ids
        let next_id_path = self.next_id_path();
        write_atomic(&next_id_path, list.next_id.to_string().as_bytes()).map_err(|source| TodoStoreError::Write {
            path: next_id_path,
            source,
        })?;
        write_atomic(&self.path, json.as_bytes()).map_err(|source| TodoStoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        info!(path = ?self.path, count = list.items.len(), "TodoStore::save: saved");
        Ok(())
    }

    fn recorded_next_id(&self) -> Option<i64> {
        let path = self.next_id_path();
        let raw = fs::read_to_string(&path).ok()?;
        match raw.trim().parse::<i64>() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(?path, %e, "TodoStore::recorded_next_id: ignoring unreadable counter");
                None
            }
        }
    }
}

fn parse_stored_item(entry: &Value) -> Option<TodoItem> {
    let id = entry.get("id")?.as_i64()?;
    // An id with no successor would overflow the next-id computation
    id.checked_add(1)?;
    let content = entry.get("content")?.as_str()?;
    if content.trim().is_empty() {
        return None;
    }
    Some(TodoItem {
        id,
        content: content.to_string(),
        status: TodoStatus::from_value(entry.get("status")).unwrap_or_default(),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn drafts(value: Value) -> Vec<Value> {
        value.as_array().unwrap().clone()
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(TodoStatus::parse("in_progress"), Some(TodoStatus::InProgress));
        assert_eq!(TodoStatus::parse("blocked"), None);
        assert_eq!(serde_json::to_value(TodoStatus::InProgress).unwrap(), json!("in_progress"));
    }

    #[test]
    fn test_add_allocates_sequential_ids() {
        let mut list = TodoList::default();

        let added = list.add(&drafts(json!([
            {"content": "  first  "},
            {"content": "second", "status": "done"},
            {"content": "third", "status": "bogus"},
            {"content": "   "},
            {"status": "done"},
            "not an object"
        ])))
        .unwrap();

        assert_eq!(added, 3);
        let items = list.items();
        assert_eq!(items[0], TodoItem { id: 1, content: "first".into(), status: TodoStatus::Pending });
        assert_eq!(items[1].status, TodoStatus::Done);
        assert_eq!(items[2].id, 3);
        assert_eq!(items[2].status, TodoStatus::Pending);
        assert_eq!(list.next_id(), 4);
    }

    #[test]
    fn test_update_applies_known_ids_only() {
        let mut list = TodoList::default();
        list.add(&drafts(json!([{"content": "a"}, {"content": "b"}]))).unwrap();

        let updated = list.update(&drafts(json!([
            {"id": 1, "status": "done"},
            {"id": 2, "content": " b2 ", "status": "nope"},
            {"id": 99, "status": "done"},
            {"id": "1", "status": "done"}
        ])));

        assert_eq!(updated, 2);
        assert_eq!(list.items()[0].status, TodoStatus::Done);
        assert_eq!(list.items()[0].content, "a");
        assert_eq!(list.items()[1].content, "b2");
        assert_eq!(list.items()[1].status, TodoStatus::Pending);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut list = TodoList::default();
        list.add(&drafts(json!([{"content": "a"}, {"content": "b"}, {"content": "c"}]))).unwrap();

        assert_eq!(list.remove(&HashSet::from([1, 3, 42])), 2);
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.remove(&HashSet::from([7])), 0);

        list.clear();
        assert!(list.items().is_empty());
        assert_eq!(list.next_id(), 4);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = tempdir().unwrap();
        let store = TodoStore::new(temp.path().join(".agent_todo.json"));

        let list = store.load().unwrap();
        assert!(list.items().is_empty());
        assert_eq!(list.next_id(), 1);
    }

    #[test]
    fn test_save_then_load() {
        let temp = tempdir().unwrap();
        let store = TodoStore::new(temp.path().join(".agent_todo.json"));
        let mut list = TodoList::default();
        list.add(&drafts(json!([{"content": "write tests", "status": "in_progress"}]))).unwrap();

        store.save(&list).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, list);
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.starts_with("[\n  {\n    \"id\": 1,"));
        assert!(raw.contains("\"status\": \"in_progress\""));
    }

    #[test]
    fn test_ids_not_reused_after_removal() {
        let temp = tempdir().unwrap();
        let store = TodoStore::new(temp.path().join(".agent_todo.json"));

        let mut list = store.load().unwrap();
        list.add(&drafts(json!([{"content": "x"}]))).unwrap();
        store.save(&list).unwrap();

        let mut list = store.load().unwrap();
        list.remove(&HashSet::from([1]));
        store.save(&list).unwrap();

        let mut list = store.load().unwrap();
        list.add(&drafts(json!([{"content": "y"}]))).unwrap();
        assert_eq!(list.items()[0].id, 2);
    }

    #[test]
    fn test_load_is_lenient() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("todo.json");
        fs::write(
            &path,
            r#"[
                {"id": 3, "content": "c", "status": "done"},
                {"id": 1, "content": "a", "status": "weird"},
                {"id": "2", "content": "bad id"},
                {"id": 4, "content": "   "},
                {"id": 5},
                {"id": 3, "content": "duplicate"},
                42
            ]"#,
        )
        .unwrap();

        let list = TodoStore::new(&path).load().unwrap();

        let ids: Vec<i64> = list.items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(list.items()[0].status, TodoStatus::Pending);
        assert_eq!(list.items()[1].content, "c");
        assert_eq!(list.next_id(), 4);
    }

    #[test]
    fn test_load_rejects_non_list_root() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("todo.json");
        fs::write(&path, r#"{"items": []}"#).unwrap();

        let err = TodoStore::new(&path).load().unwrap_err();
        assert!(matches!(err, TodoStoreError::NotAList { kind: "object" }));
        assert_eq!(err.to_string(), "todo store must be a list, got object");
    }

    #[test]
    fn test_load_rejects_invalid_json_and_directories() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("todo.json");
        fs::write(&path, "[{").unwrap();
        assert!(matches!(TodoStore::new(&path).load().unwrap_err(), TodoStoreError::InvalidJson { .. }));

        let dir = temp.path().join("dir");
        fs::create_dir(&dir).unwrap();
        assert!(matches!(TodoStore::new(&dir).load().unwrap_err(), TodoStoreError::NotAFile { .. }));
    }

    #[test]
    fn test_load_drops_id_without_successor() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("todo.json");
        fs::write(
            &path,
            r#"[{"id": 9223372036854775807, "content": "max"}, {"id": 2, "content": "ok"}]"#,
        )
        .unwrap();

        let list = TodoStore::new(&path).load().unwrap();

        let ids: Vec<i64> = list.items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(list.next_id(), 3);
    }

    #[test]
    fn test_add_fails_when_ids_exhausted() {
        let temp = tempdir().unwrap();
        let store = TodoStore::new(temp.path().join("todo.json"));
        fs::write(store.path(), r#"[{"id": 9223372036854775806, "content": "last"}]"#).unwrap();

        let mut list = store.load().unwrap();
        assert_eq!(list.next_id(), i64::MAX);

        let err = list.add(&drafts(json!([{"content": "one more"}]))).unwrap_err();
        assert!(matches!(err, TodoStoreError::IdsExhausted));
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.next_id(), i64::MAX);
    }

    #[test]
    fn test_sidecar_at_max_does_not_overflow() {
        let temp = tempdir().unwrap();
        let store = TodoStore::new(temp.path().join("todo.json"));
        fs::write(temp.path().join("todo.json.next-id"), i64::MAX.to_string()).unwrap();

        let mut list = store.load().unwrap();
        assert_eq!(list.next_id(), i64::MAX);
        assert!(matches!(
            list.add(&drafts(json!([{"content": "x"}]))),
            Err(TodoStoreError::IdsExhausted)
        ));
    }
}
