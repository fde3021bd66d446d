//! Folder tree and list entries from `GetLists`

use std::collections::{HashMap, HashSet};

use chrono::DateTime;
use chrono_tz::Tz;
use serde_json::{Map, Value};

use crate::datetime::parse_timestamp;
use crate::error::{Result, SilverError};
use crate::rpc::{is_truthy, scalar_text};

/// Folder id -> (name, parent id), built per enumeration call
#[derive(Debug, Default, Clone)]
pub struct FolderIndex {
    folders: HashMap<String, (String, Option<String>)>,
}

impl FolderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>, parent: Option<String>) {
        self.folders.insert(id.into(), (name.into(), parent));
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Names from the root down to `id`. Unknown ids give an empty path.
    ///
    /// The walk stops at the first parent that is not itself a folder. A
    /// cycle in malformed data ends the walk instead of looping.
    pub fn path(&self, id: &str) -> Vec<String> {
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);

        while let Some(fid) = current {
            if !seen.insert(fid) {
                break;
            }
            let Some((name, parent)) = self.folders.get(fid) else {
                break;
            };
            names.push(name.clone());
            current = parent.as_deref();
        }

        names.reverse();
        names
    }
}

/// A leaf list decorated with its folder path and parsed timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub id: String,
    pub name: String,
    pub list_type: Option<String>,
    pub folder_path: Vec<String>,
    pub last_modified: Option<DateTime<Tz>>,
    /// Every other field, untouched
    pub fields: Map<String, Value>,
}

fn text_field(item: &Map<String, Value>, name: &str) -> Option<String> {
    item.get(name).and_then(scalar_text).filter(|s| !s.is_empty())
}

/// Split raw `GetLists` items into folders and leaves, then decorate the
/// leaves. Leaf order is the order received.
pub fn decorate_lists(items: Vec<Value>, tz: Tz) -> Result<Vec<ListEntry>> {
    let mut index = FolderIndex::new();
    let mut leaves = Vec::new();

    for item in items {
        let item = match item {
            Value::Object(item) => item,
            other => {
                return Err(SilverError::InvalidResponse(format!(
                    "GetLists item is not a record: {}",
                    other
                )));
            }
        };
        if item.get("IS_FOLDER").is_some_and(is_truthy) {
            let id = text_field(&item, "ID").ok_or_else(|| {
                SilverError::InvalidResponse("GetLists folder without ID".to_string())
            })?;
            let name = text_field(&item, "NAME").unwrap_or_default();
            index.insert(id, name, text_field(&item, "PARENT_FOLDER_ID"));
        } else {
            leaves.push(item);
        }
    }

    leaves
        .into_iter()
        .map(|mut item| {
            let id = text_field(&item, "ID").ok_or_else(|| {
                SilverError::InvalidResponse("GetLists list without ID".to_string())
            })?;
            let folder_path = text_field(&item, "PARENT_FOLDER_ID")
                .map(|parent| index.path(&parent))
                .unwrap_or_default();
            let last_modified = text_field(&item, "LAST_MODIFIED")
                .map(|text| parse_timestamp(&text, tz))
                .transpose()?;

            item.remove("ID");
            let name = item
                .remove("NAME")
                .as_ref()
                .and_then(scalar_text)
                .unwrap_or_default();
            let list_type = item.remove("TYPE").as_ref().and_then(scalar_text);
            item.remove("LAST_MODIFIED");

            Ok(ListEntry {
                id,
                name,
                list_type,
                folder_path,
                last_modified,
                fields: item,
            })
        })
        .collect()
}
