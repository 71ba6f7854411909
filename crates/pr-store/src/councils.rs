//! Council (named, reusable voice plan) repository.

use chrono::Utc;
use pr_core::AppError;
use pr_core::model::{Council, ConfigType};
use rusqlite::{OptionalExtension, Row, params};
use ulid::Ulid;

use crate::Store;

fn row_to_council(row: &Row) -> rusqlite::Result<Council> {
    let council_type: String = row.get("council_type")?;
    let config_json: String = row.get("config_json")?;
    Ok(Council {
        id: row.get("id")?,
        name: row.get("name")?,
        council_type: match council_type.as_str() {
            "advanced" => ConfigType::Advanced,
            "council" => ConfigType::Council,
            _ => ConfigType::Single,
        },
        config: serde_json::from_str(&config_json).unwrap_or(serde_json::json!({})),
        last_used_at: row.get("last_used_at")?,
    })
}

impl Store {
    pub async fn create_council(
        &self,
        name: &str,
        council_type: ConfigType,
        config: serde_json::Value,
    ) -> Result<Council, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput("council name must not be empty".into()));
        }
        let conn = self.lock().await;
        let id = Ulid::new().to_string();
        conn.execute(
            "INSERT INTO councils (id, name, council_type, config_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, name.trim(), council_type.as_str(), config.to_string(), Utc::now()],
        )?;
        fetch(&conn, &id)
    }

    pub async fn get_council(&self, id: &str) -> Result<Council, AppError> {
        let conn = self.lock().await;
        fetch(&conn, id)
    }

    pub async fn list_councils(&self) -> Result<Vec<Council>, AppError> {
        let conn = self.lock().await;
        let mut stmt = conn.prepare("SELECT * FROM councils ORDER BY name ASC")?;
        let rows = stmt.query_map([], row_to_council)?.collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Bump `last_used_at` to now, called whenever a council is picked for a run.
    pub async fn touch_council(&self, id: &str) -> Result<Council, AppError> {
        let conn = self.lock().await;
        fetch(&conn, id)?;
        conn.execute(
            "UPDATE councils SET last_used_at = ?2 WHERE id = ?1",
            params![id, Utc::now()],
        )?;
        fetch(&conn, id)
    }

    pub async fn delete_council(&self, id: &str) -> Result<(), AppError> {
        let conn = self.lock().await;
        fetch(&conn, id)?;
        conn.execute("DELETE FROM councils WHERE id = ?1", params![id])?;
        Ok(())
    }
}

fn fetch(conn: &rusqlite::Connection, id: &str) -> Result<Council, AppError> {
    conn.query_row("SELECT * FROM councils WHERE id = ?1", params![id], row_to_council)
        .optional()?
        .ok_or_else(|| AppError::not_found("council", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_council_rejects_empty_name() {
        let store = Store::open_in_memory().unwrap();
        let err = store.create_council("  ", ConfigType::Council, serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn touch_council_updates_last_used_at() {
        let store = Store::open_in_memory().unwrap();
        let council = store
            .create_council("security-trio", ConfigType::Council, serde_json::json!({"voices": 3}))
            .await
            .unwrap();
        assert!(council.last_used_at.is_none());
        let touched = store.touch_council(&council.id).await.unwrap();
        assert!(touched.last_used_at.is_some());
    }

    #[tokio::test]
    async fn list_councils_orders_by_name() {
        let store = Store::open_in_memory().unwrap();
        store.create_council("zeta", ConfigType::Single, serde_json::json!({})).await.unwrap();
        store.create_council("alpha", ConfigType::Single, serde_json::json!({})).await.unwrap();
        let all = store.list_councils().await.unwrap();
        assert_eq!(all[0].name, "alpha");
        assert_eq!(all[1].name, "zeta");
    }

    #[tokio::test]
    async fn delete_council_removes_it() {
        let store = Store::open_in_memory().unwrap();
        let council = store.create_council("temp", ConfigType::Single, serde_json::json!({})).await.unwrap();
        store.delete_council(&council.id).await.unwrap();
        assert!(store.get_council(&council.id).await.is_err());
    }
}
