use serde::{Deserialize, Serialize};

use crate::api::SortOrder;
use crate::entities::EntityKind;

/// Per-kind view preferences that survive a reload: filters, sort,
/// column visibility and the filter-panel flag. Selection and open-modal
/// state are deliberately absent — they always reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewPreferences {
    pub kind: EntityKind,
    pub status_filter: Option<String>,
    pub facet_filter: Option<String>,
    pub sort_by: String,
    pub sort_order: SortOrder,
    pub hidden_columns: Vec<String>,
    pub filter_panel_open: bool,
}

impl ViewPreferences {
    pub fn default_for(kind: EntityKind) -> Self {
        Self {
            kind,
            status_filter: None,
            facet_filter: None,
            sort_by: "created_at".to_string(),
            sort_order: SortOrder::Desc,
            hidden_columns: Vec::new(),
            filter_panel_open: false,
        }
    }
}
