//! todo_list tool - CRUD over the workspace todo store

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::run_blocking;
use crate::store::{TodoItem, TodoStore};
use crate::tools::traits::parse_input;
use crate::tools::{Tool, ToolContext, ToolResult};

/// `items_json` arrives either as a JSON-encoded string or as a real array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemsJson {
    Items(Vec<Value>),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct TodoRequest {
    action: String,
    #[serde(default)]
    items_json: Option<ItemsJson>,
    #[serde(default)]
    ids: Option<Vec<Value>>,
    #[serde(default)]
    file_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    List,
    Add,
    Update,
    Remove,
    Clear,
}

impl Action {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "list" => Some(Self::List),
            "add" => Some(Self::Add),
            "update" => Some(Self::Update),
            "remove" => Some(Self::Remove),
            "clear" => Some(Self::Clear),
            _ => None,
        }
    }
}

/// Every todo_list call answers with this object, success or not
#[derive(Debug, Serialize)]
struct TodoResponse {
    ok: bool,
    message: String,
    items: Vec<TodoItem>,
}

impl TodoResponse {
    fn ok(message: impl Into<String>, items: Vec<TodoItem>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            items,
        }
    }

    fn failed(message: impl Into<String>, items: Vec<TodoItem>) -> Self {
        let message = message.into();
        debug!(%message, "TodoResponse::failed: called");
        Self {
            ok: false,
            message,
            items,
        }
    }
}

impl From<TodoResponse> for ToolResult {
    fn from(resp: TodoResponse) -> Self {
        let ok = resp.ok;
        let content = serde_json::to_string(&resp).unwrap_or_else(|e| {
            serde_json::json!({"ok": false, "message": format!("Error: {}", e), "items": []}).to_string()
        });
        if ok { ToolResult::success(content) } else { ToolResult::error(content) }
    }
}

/// Manage the persistent todo list
pub struct TodoTool;

#[async_trait]
impl Tool for TodoTool {
    fn name(&self) -> &'static str {
        "todo_list"
    }

    fn description(&self) -> &'static str {
        "Manage a persistent todo list stored in a workspace file. Actions: list, add, update, \
         remove, clear. Returns JSON {\"ok\": bool, \"message\": str, \"items\": [...]}."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["list", "add", "update", "remove", "clear"],
                    "description": "Operation to perform"
                },
                "items_json": {
                    "type": "string",
                    "description": "For add: [{\"content\": str, \"status\": \"pending|in_progress|done\"}]. \
                                    For update: [{\"id\": int, \"content\": str, \"status\": str}]"
                },
                "ids": {
                    "type": "array",
                    "items": {"type": "integer"},
                    "description": "For remove: ids to delete"
                },
                "file_path": {
                    "type": "string",
                    "description": "Absolute path to the JSON store (default: .agent_todo.json in the workspace root)"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "TodoTool::execute: called");
        let req: TodoRequest = match parse_input(self.name(), input) {
            Ok(r) => r,
            Err(e) => return TodoResponse::failed(format!("Error: {}", e), Vec::new()).into(),
        };

        let store_path = match &req.file_path {
            Some(p) => ctx.validate_path("file_path", p),
            None => {
                let default = ctx.workspace_root.join(&ctx.todo.store_name);
                ctx.validate_path("file_path", &default.to_string_lossy())
            }
        };
        let store = match store_path {
            Ok(p) => TodoStore::new(p),
            Err(e) => {
                debug!(%e, "TodoTool::execute: store path rejected");
                return TodoResponse::failed(format!("Error: {}", e), Vec::new()).into();
            }
        };

        match run_blocking(move || Ok(apply(&store, req))).await {
            Ok(resp) => resp.into(),
            Err(e) => TodoResponse::failed(format!("Error: {}", e), Vec::new()).into(),
        }
    }
}

/// Load, mutate and save; failures report the state from before the call
fn apply(store: &TodoStore, req: TodoRequest) -> TodoResponse {
    let mut list = match store.load() {
        Ok(list) => list,
        Err(e) => return TodoResponse::failed(format!("Error: {}", e), Vec::new()),
    };
    let previous = list.items().to_vec();

    let Some(action) = Action::parse(&req.action) else {
        return TodoResponse::failed("Error: invalid action", previous);
    };
    debug!(?action, path = ?store.path(), "apply: called");

    let message = match action {
        Action::List => return TodoResponse::ok("OK", previous),
        Action::Clear => {
            list.clear();
            "Cleared".to_string()
        }
        Action::Add | Action::Update => {
            let entries = match parse_entries(req.items_json) {
                Ok(entries) if !entries.is_empty() => entries,
                Ok(_) => return TodoResponse::failed("Error: items must be a non-empty list", previous),
                Err(message) => return TodoResponse::failed(message, previous),
            };
            if action == Action::Add {
                match list.add(&entries) {
                    Ok(0) => return TodoResponse::failed("Error: no valid items to add", previous),
                    Ok(n) => format!("Added {} item(s)", n),
                    Err(e) => return TodoResponse::failed(format!("Error: {}", e), previous),
                }
            } else {
                match list.update(&entries) {
                    0 => return TodoResponse::failed("Error: no valid items to update", previous),
                    n => format!("Updated {} item(s)", n),
                }
            }
        }
        Action::Remove => {
            let raw_ids = match req.ids {
                Some(ids) if !ids.is_empty() => ids,
                _ => return TodoResponse::failed("Error: ids must be a non-empty list", previous),
            };
            let ids: HashSet<i64> = raw_ids.iter().filter_map(Value::as_i64).collect();
            if ids.is_empty() {
                return TodoResponse::failed("Error: ids must contain integers", previous);
            }
            match list.remove(&ids) {
                0 => return TodoResponse::failed("Error: no matching ids to remove", previous),
                n => format!("Removed {} item(s)", n),
            }
        }
    };

    if let Err(e) = store.save(&list) {
        return TodoResponse::failed(format!("Error: {}", e), previous);
    }
    info!(%message, path = ?store.path(), "apply: todo store updated");
    TodoResponse::ok(message, list.items().to_vec())
}

fn parse_entries(items_json: Option<ItemsJson>) -> Result<Vec<Value>, String> {
    match items_json {
        None => Ok(Vec::new()),
        Some(ItemsJson::Items(items)) => Ok(items),
        Some(ItemsJson::Text(text)) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(_) => Err("Error: items_json must be a JSON array".to_string()),
            Err(e) => Err(format!("Error: items_json is invalid JSON: {}", e)),
        },
    }
}
