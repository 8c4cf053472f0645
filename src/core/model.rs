//! On-disk document shapes for the knowledge store (`spec.md` §3).
//!
//! Every document here derives `Serialize`/`Deserialize` with `#[serde(default)]`
//! on every field so that older or partially-ingested documents load without
//! error; normalization (canonicalizing enums, filling required sub-objects)
//! happens explicitly in `core::mutator` and `core::loader`, not in `Deserialize`
//! impls — unknown fields round-trip untouched because callers that only need
//! to patch one field go through `serde_json::Value` merges rather than a full
//! struct re-serialize (see `atomic_store::update_json`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------
// Project / index
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectMeta {
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexRef {
    pub page: String,
    #[serde(default)]
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KnowledgeIndex {
    #[serde(default)]
    pub keyword: HashMap<String, Vec<IndexRef>>,
    #[serde(default)]
    pub material: HashMap<String, Vec<IndexRef>>,
    #[serde(default)]
    pub cross_refs: HashMap<String, Vec<String>>,
}

// ---------------------------------------------------------------------
// Pages / regions
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegionRef {
    pub region_id: String,
    #[serde(default)]
    pub bbox: Option<BBox>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CrossReference {
    #[serde(default)]
    pub target_page: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Pass1 {
    #[serde(default)]
    pub discipline: String,
    #[serde(default)]
    pub page_type: String,
    #[serde(default)]
    pub regions: Vec<RegionRef>,
    #[serde(default)]
    pub cross_references: Vec<CrossReference>,
    #[serde(default)]
    pub sheet_reflection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PageMeta {
    pub page_name: String,
    #[serde(default)]
    pub discipline: String,
    #[serde(default)]
    pub page_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Pass2 {
    #[serde(default)]
    pub content_markdown: String,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub keynotes: Vec<String>,
    #[serde(default)]
    pub cross_references: Vec<CrossReference>,
    #[serde(default)]
    pub coordination_notes: Vec<String>,
    #[serde(default)]
    pub specifications: Vec<String>,
}

// ---------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn is_valid(&self) -> bool {
        self.x0.is_finite()
            && self.y0.is_finite()
            && self.x1.is_finite()
            && self.y1.is_finite()
            && self.x0 < self.x1
            && self.y0 < self.y1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CustomHighlight {
    #[serde(default)]
    pub id: String,
    pub bbox: BBox,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkspacePage {
    pub page_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub selected_pointers: Vec<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub custom_highlights: Vec<CustomHighlight>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkspaceNote {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneratedImage {
    pub filename: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub reference_pages: Vec<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Workspace {
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub pages: Vec<WorkspacePage>,
    #[serde(default)]
    pub notes: Vec<WorkspaceNote>,
    #[serde(default)]
    pub generated_images: Vec<GeneratedImage>,
}

// ---------------------------------------------------------------------
// Project notes
// ---------------------------------------------------------------------

pub const GENERAL_CATEGORY_ID: &str = "general";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CategoryColor {
    Slate,
    Blue,
    Green,
    Amber,
    Red,
    Purple,
}

impl Default for CategoryColor {
    fn default() -> Self {
        CategoryColor::Slate
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NoteCategory {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: CategoryColor,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    Open,
    Archived,
}

impl Default for NoteStatus {
    fn default() -> Self {
        NoteStatus::Open
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NoteSourcePage {
    pub page_name: String,
    #[serde(default)]
    pub workspace_slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectNote {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub source_pages: Vec<NoteSourcePage>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub status: NoteStatus,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectNotes {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub categories: Vec<NoteCategory>,
    #[serde(default)]
    pub notes: Vec<ProjectNote>,
}

// ---------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleItemType {
    Activity,
    Milestone,
    Constraint,
    Inspection,
    Delivery,
    Task,
}

impl Default for ScheduleItemType {
    fn default() -> Self {
        ScheduleItemType::Activity
    }
}

impl ScheduleItemType {
    pub fn parse_or_default(s: &str) -> (Self, bool) {
        match s {
            "activity" => (Self::Activity, true),
            "milestone" => (Self::Milestone, true),
            "constraint" => (Self::Constraint, true),
            "inspection" => (Self::Inspection, true),
            "delivery" => (Self::Delivery, true),
            "task" => (Self::Task, true),
            _ => (Self::Activity, false),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleItemStatus {
    Pending,
    InProgress,
    Blocked,
    Done,
    Cancelled,
}

impl Default for ScheduleItemStatus {
    fn default() -> Self {
        ScheduleItemStatus::Pending
    }
}

impl ScheduleItemStatus {
    pub fn parse_or_default(s: &str) -> (Self, bool) {
        match s {
            "pending" => (Self::Pending, true),
            "in_progress" => (Self::InProgress, true),
            "blocked" => (Self::Blocked, true),
            "done" => (Self::Done, true),
            "cancelled" => (Self::Cancelled, true),
            _ => (Self::Pending, false),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ScheduleItemStatus::Done | ScheduleItemStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScheduleItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub r#type: ScheduleItemType,
    #[serde(default)]
    pub status: ScheduleItemStatus,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub activity_id: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub closed_at: String,
    #[serde(default)]
    pub close_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Schedule {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub items: Vec<ScheduleItem>,
}

// ---------------------------------------------------------------------
// Fleet registry / heartbeat / directives
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Commander,
    Project,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FleetAgent {
    pub agent_id: String,
    #[serde(default)]
    pub project_slug: String,
    #[serde(default)]
    pub display_name: String,
    pub role: Option<AgentRole>,
    #[serde(default)]
    pub registered_at: String,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FleetRegistryDoc {
    #[serde(default)]
    pub agents: Vec<FleetAgent>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    Idle,
    Computing,
    Blocked,
}

impl Default for LoopState {
    fn default() -> Self {
        LoopState::Idle
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Heartbeat {
    #[serde(default)]
    pub loop_state: LoopState,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub metrics: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Directive {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub archived_at: Option<String>,
    #[serde(default)]
    pub updated_by: String,
    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DirectiveStoreDoc {
    #[serde(default)]
    pub directives: Vec<Directive>,
}

/// One message in a command-center-to-agent conversation log
/// (`spec.md` §4.H conversation endpoints).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub source: String,
    pub message: String,
    pub sent_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConversationLog {
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_validity() {
        let ok = BBox { x0: 0.0, y0: 0.0, x1: 1.0, y1: 1.0 };
        assert!(ok.is_valid());
        let bad = BBox { x0: 1.0, y0: 0.0, x1: 0.0, y1: 1.0 };
        assert!(!bad.is_valid());
        let nan = BBox { x0: f64::NAN, y0: 0.0, x1: 1.0, y1: 1.0 };
        assert!(!nan.is_valid());
    }

    #[test]
    fn schedule_type_unknown_clamps_to_activity() {
        let (t, ok) = ScheduleItemType::parse_or_default("bogus");
        assert_eq!(t, ScheduleItemType::Activity);
        assert!(!ok);
    }

    #[test]
    fn schedule_status_terminal() {
        assert!(ScheduleItemStatus::Done.is_terminal());
        assert!(ScheduleItemStatus::Cancelled.is_terminal());
        assert!(!ScheduleItemStatus::Pending.is_terminal());
    }

    #[test]
    fn workspace_defaults_to_empty_collections() {
        let ws: Workspace = serde_json::from_str("{}").unwrap();
        assert!(ws.pages.is_empty());
        assert!(ws.notes.is_empty());
    }
}
