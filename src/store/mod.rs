pub mod models;


use anyhow::Result;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub use models::*;

use crate::api::SortOrder;
use crate::entities::EntityKind;

/// Local rusqlite store for view preferences and app settings.
pub struct PrefsStore {
    conn: Arc<Mutex<Connection>>,
}

impl PrefsStore {
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        // Enable WAL mode for concurrent reads
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
        ",
        )?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Opens (creating if needed) the store at its default location under
    /// the user's home directory.
    pub fn open_default() -> Result<Self> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("failed to get home directory"))?;
        let data_dir = home_dir.join(".postdeck");
        std::fs::create_dir_all(&data_dir)?;
        Self::new(&data_dir.join("postdeck.db"))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS app_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT
            );

            CREATE TABLE IF NOT EXISTS view_preferences (
                kind TEXT PRIMARY KEY,
                status_filter TEXT,
                facet_filter TEXT,
                sort_by TEXT NOT NULL DEFAULT 'created_at',
                sort_order TEXT NOT NULL DEFAULT 'desc',
                hidden_columns TEXT NOT NULL DEFAULT '[]',
                filter_panel_open INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT
            );
        "#,
        )?;
        Ok(())
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT value FROM app_settings WHERE key = ?",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR REPLACE INTO app_settings (key, value, updated_at) VALUES (?, ?, ?)",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get_all_settings(&self) -> Result<HashMap<String, String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT key, value FROM app_settings")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut settings = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            settings.insert(key, value);
        }
        Ok(settings)
    }

    // =========================================================================
    // View preferences
    // =========================================================================

    /// Loads the saved preferences for a kind, or the defaults when the
    /// kind has never been customized.
    pub fn view_preferences(&self, kind: EntityKind) -> Result<ViewPreferences> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT status_filter, facet_filter, sort_by, sort_order,
                    hidden_columns, filter_panel_open
             FROM view_preferences WHERE kind = ?",
            params![kind.as_str()],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, bool>(5)?,
                ))
            },
        );

        match result {
            Ok((status_filter, facet_filter, sort_by, sort_order, hidden, panel_open)) => {
                let hidden_columns: Vec<String> =
                    serde_json::from_str(&hidden).unwrap_or_default();
                Ok(ViewPreferences {
                    kind,
                    status_filter,
                    facet_filter,
                    sort_by,
                    sort_order: match sort_order.as_str() {
                        "asc" => SortOrder::Asc,
                        _ => SortOrder::Desc,
                    },
                    hidden_columns,
                    filter_panel_open: panel_open,
                })
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(ViewPreferences::default_for(kind)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_view_preferences(&self, prefs: &ViewPreferences) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let hidden = serde_json::to_string(&prefs.hidden_columns)?;
        conn.execute(
            "INSERT OR REPLACE INTO view_preferences
                (kind, status_filter, facet_filter, sort_by, sort_order,
                 hidden_columns, filter_panel_open, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                prefs.kind.as_str(),
                prefs.status_filter,
                prefs.facet_filter,
                prefs.sort_by,
                prefs.sort_order.as_str(),
                hidden,
                prefs.filter_panel_open,
                now
            ],
        )?;
        Ok(())
    }
}
