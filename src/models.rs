use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Todo,
    Idea,
    Bug,
    Note,
    Progress,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [Self::Todo, Self::Idea, Self::Bug, Self::Note, Self::Progress];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Idea => "idea",
            Self::Bug => "bug",
            Self::Note => "note",
            Self::Progress => "progress",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }

    /// Human-readable name shown in the capture window and record lists.
    pub fn label(self) -> &'static str {
        match self {
            Self::Todo => "Todo",
            Self::Idea => "Idea",
            Self::Bug => "Bug",
            Self::Note => "Note",
            Self::Progress => "Progress",
        }
    }

    /// Hint text for the editor input of this kind.
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::Todo => "What needs to be done?",
            Self::Idea => "Capture the idea before it slips away...",
            Self::Bug => "Describe the bug and how to reproduce it...",
            Self::Note => "Write your note...",
            Self::Progress => "What did you get done today?",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdeaStatus {
    #[default]
    Pending,
    InProgress,
    Implemented,
    Discarded,
}

impl IdeaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Implemented => "implemented",
            Self::Discarded => "discarded",
        }
    }

    /// Also accepts `active` and `completed`, written by older project files.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" | "active" => Some(Self::Pending),
            "in-progress" => Some(Self::InProgress),
            "implemented" | "completed" => Some(Self::Implemented),
            "discarded" => Some(Self::Discarded),
            _ => None,
        }
    }
}

/// A parsed quick-capture command: what to create and an optional title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Intent {
    pub fn editor_params(&self) -> EditorParams {
        EditorParams {
            block_type: self.kind,
            title: self.title.clone(),
        }
    }
}

/// Payload handed to the editor window when a command is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorParams {
    pub block_type: RecordKind,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub priority: i64,
    pub finished: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub idea_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub idea_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<bool>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bug {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub fixed: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBug {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fixed: bool,
    #[serde(default)]
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BugPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<bool>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub status: IdeaStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewIdea {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: Option<IdeaStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdeaPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IdeaStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// One day's progress log. `content` is stored as a JSON array of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub id: i64,
    pub date: NaiveDate,
    pub content: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Scratch record on the capture workspace. Only blocks created today are live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub content: String,
    pub related_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub related_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub related_id: Option<Option<i64>>,
}

// A key that is present (even as `null`) deserializes to `Some(_)`; an absent
// key falls back to `#[serde(default)]`, i.e. `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
