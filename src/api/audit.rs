//! Graph request audit log.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::db::Db;
use crate::error::{Result, VisError};
use crate::graph::GraphResult;

/// Record one vis request and how it ended.
///
/// Returns the generated request id (UUID).
pub async fn log_request(
    db: &Db,
    analyst: Option<&str>,
    start_id: &str,
    outcome: &Result<GraphResult>,
) -> Result<String> {
    let request_id = Uuid::new_v4().to_string();
    let timestamp = Utc::now().to_rfc3339();

    let (status, node_count, edge_count, error_message) = match outcome {
        Ok(GraphResult::Found(graph)) => ("ok", graph.nodes.len() as i64, graph.edges.len() as i64, None),
        Ok(GraphResult::NotFound) => ("not_found", 0, 0, None),
        Err(e) => ("error", 0, 0, Some(e.to_string())),
    };

    let id = request_id.clone();
    let analyst = analyst.map(String::from);
    let start_id = start_id.to_string();

    db.with_connection(move |conn| {
        conn.execute(
            r#"
            INSERT INTO vis_requests (
                request_id, timestamp, analyst, start_id,
                outcome, node_count, edge_count, error_message
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![id, timestamp, analyst, start_id, status, node_count, edge_count, error_message],
        )?;
        Ok::<(), VisError>(())
    })
    .await?;

    Ok(request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;
    use crate::graph::{GraphEdge, VisGraph};
    use std::path::Path;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_log_outcomes() {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("audit.db"));
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
            .await
            .unwrap();

        let graph = VisGraph {
            nodes: vec![],
            edges: vec![GraphEdge { from_id: "a".into(), to_id: "b".into() }],
        };
        let ok_id = log_request(&db, Some("alice"), "a", &Ok(GraphResult::Found(graph))).await.unwrap();
        log_request(&db, None, "zzz", &Ok(GraphResult::NotFound)).await.unwrap();
        log_request(&db, Some("bob"), "b", &Err(VisError::BudgetExceeded("node limit 5 reached".into())))
            .await
            .unwrap();

        let rows: Vec<(String, String, i64, Option<String>)> = db
            .with_connection(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT request_id, outcome, edge_count, error_message FROM vis_requests ORDER BY rowid",
                )?;
                let rows = stmt
                    .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))?
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
                Ok(rows)
            })
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, ok_id);
        assert_eq!(rows[0].1, "ok");
        assert_eq!(rows[0].2, 1);
        assert_eq!(rows[1].1, "not_found");
        assert_eq!(rows[2].1, "error");
        assert!(rows[2].3.as_deref().unwrap().contains("node limit"));
    }
}
