use super::schema::{self, Columns, Goal, METRIC_KEYS};
use crate::Result;
use rusqlite::{named_params, params, Connection, OptionalExtension};
use std::collections::HashMap;
use tracing::warn;

pub fn select_all(conn: &Connection) -> Result<Vec<Goal>> {
    let sql = format!(
        r#"
            SELECT {projection}
            FROM {table}
            ORDER BY {project}
        "#,
        projection = Goal::projection(),
        table = schema::TABLE_NAME,
        project = Columns::Project.as_str(),
    );
    Ok(conn
        .prepare(&sql)?
        .query_map([], Goal::mapper())?
        .collect::<Result<Vec<_>, _>>()?)
}

pub fn select_by_project(project: &str, conn: &Connection) -> Result<Option<Goal>> {
    let sql = format!(
        r#"
            SELECT {projection}
            FROM {table}
            WHERE {project} = ?1
        "#,
        projection = Goal::projection(),
        table = schema::TABLE_NAME,
        project = Columns::Project.as_str(),
    );
    Ok(conn
        .query_row(&sql, params![project], Goal::mapper())
        .optional()?)
}

/// Returns the stored goal set for a project, creating an all-zero record on
/// first access
pub fn ensure(project: &str, conn: &Connection) -> Result<Goal> {
    let sql = format!(
        r#"
            INSERT OR IGNORE INTO {table} ({project})
            VALUES (:project)
        "#,
        table = schema::TABLE_NAME,
        project = Columns::Project.as_str(),
    );
    conn.execute(&sql, named_params! { ":project": project })?;
    select_by_project(project, conn)?.ok_or(format!("Failed to ensure goal for {project}").into())
}

pub fn ensure_all(projects: &[&str], conn: &Connection) -> Result<Vec<Goal>> {
    projects.iter().map(|it| ensure(it, conn)).collect()
}

/// Merges the provided metric values into a project's goal set. Keys not
/// present in the payload keep their stored values, unknown keys are dropped
/// with a warning.
pub fn upsert(project: &str, metrics: &HashMap<String, i64>, conn: &Connection) -> Result<Goal> {
    ensure(project, conn)?;
    let known: Vec<(&str, i64)> = METRIC_KEYS
        .iter()
        .filter_map(|key| metrics.get(*key).map(|value| (*key, (*value).max(0))))
        .collect();
    for key in metrics.keys() {
        if !METRIC_KEYS.contains(&key.as_str()) {
            warn!(project, key, "Dropping unknown goal metric");
        }
    }
    for (column, value) in known {
        let sql = format!(
            r#"
                UPDATE {table}
                SET {column} = :value, {updated_at} = strftime('%Y-%m-%dT%H:%M:%SZ')
                WHERE {project} = :project
            "#,
            table = schema::TABLE_NAME,
            updated_at = Columns::UpdatedAt.as_str(),
            project = Columns::Project.as_str(),
        );
        conn.execute(&sql, named_params! { ":value": value, ":project": project })?;
    }
    select_by_project(project, conn)?.ok_or(format!("Goal for {project} went missing").into())
}

#[cfg(test)]
mod test {
    use crate::test::mock_conn;
    use crate::Result;
    use std::collections::HashMap;

    #[test]
    fn ensure_creates_zero_goal() -> Result<()> {
        let conn = mock_conn();
        let goal = super::ensure("SUNNY", &conn)?;
        assert_eq!("SUNNY", goal.project);
        assert_eq!(0, goal.prospectos_totales);
        assert_eq!(0, goal.metas_minutas);
        Ok(())
    }

    #[test]
    fn ensure_is_idempotent() -> Result<()> {
        let conn = mock_conn();
        super::upsert(
            "SUNNY",
            &HashMap::from([("prospectos_totales".to_string(), 100)]),
            &conn,
        )?;
        let goal = super::ensure("SUNNY", &conn)?;
        assert_eq!(100, goal.prospectos_totales);
        assert_eq!(1, super::select_all(&conn)?.len());
        Ok(())
    }

    #[test]
    fn upsert_merges_partial_payload() -> Result<()> {
        let conn = mock_conn();
        super::upsert(
            "LITORAL 900",
            &HashMap::from([
                ("prospectos_totales".to_string(), 100),
                ("metas_minutas".to_string(), 5),
            ]),
            &conn,
        )?;
        let goal = super::upsert(
            "LITORAL 900",
            &HashMap::from([("metas_minutas".to_string(), 8)]),
            &conn,
        )?;
        assert_eq!(100, goal.prospectos_totales);
        assert_eq!(8, goal.metas_minutas);
        Ok(())
    }

    #[test]
    fn upsert_is_idempotent() -> Result<()> {
        let conn = mock_conn();
        let payload = HashMap::from([
            ("prospectos_totales".to_string(), 100),
            ("prospectos_digitales".to_string(), 20),
            ("contactados".to_string(), 25),
            ("visitas_sala".to_string(), 30),
            ("separaciones_totales".to_string(), 4),
            ("metas_minutas".to_string(), 2),
        ]);
        let first = super::upsert("SUNNY", &payload, &conn)?;
        let second = super::upsert("SUNNY", &payload, &conn)?;
        assert_eq!(first.metrics_map(), second.metrics_map());
        assert_eq!(1, super::select_all(&conn)?.len());
        Ok(())
    }

    #[test]
    fn upsert_drops_unknown_keys() -> Result<()> {
        let conn = mock_conn();
        let goal = super::upsert(
            "SUNNY",
            &HashMap::from([
                ("prospectos_totales".to_string(), 10),
                ("no_such_metric".to_string(), 99),
            ]),
            &conn,
        )?;
        assert_eq!(10, goal.prospectos_totales);
        assert_eq!(None, goal.metric("no_such_metric"));
        Ok(())
    }

    #[test]
    fn upsert_clamps_negative_values() -> Result<()> {
        let conn = mock_conn();
        let goal = super::upsert(
            "SUNNY",
            &HashMap::from([("visitas_sala".to_string(), -5)]),
            &conn,
        )?;
        assert_eq!(0, goal.visitas_sala);
        Ok(())
    }

    #[test]
    fn select_by_project_missing() -> Result<()> {
        let conn = mock_conn();
        assert!(super::select_by_project("SUNNY", &conn)?.is_none());
        Ok(())
    }
}
