use anyhow::{bail, Context, Result};
use log::info;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

use crate::data::schema::COLORS_TABLE;

const RGB_INDEX: &str = "idx_rgb";

/// Read-only view of a color database file, for diagnosing schema problems
pub struct DbInspector {
    connection: Connection,
}

/// One row of `pragma_table_info`, reduced to what the color checks read
#[derive(Debug, Clone)]
pub struct TableColumn {
    pub name: String,
    pub column_type: String,
    pub notnull: bool,
    /// 1-based position in the primary key, 0 when not part of it
    pub pk: i32,
}

impl DbInspector {
    pub fn new(db_path: &Path) -> Result<Self> {
        if !db_path.exists() {
            bail!("Database file does not exist: {}", db_path.display());
        }

        let connection = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open {} read-only", db_path.display()))?;

        Ok(Self { connection })
    }

    /// User tables, by name
    pub fn tables(&self) -> Result<Vec<String>> {
        self.names(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            params![],
        )
        .context("Failed to list tables")
    }

    pub fn indexes(&self, table: &str) -> Result<Vec<String>> {
        self.names(
            "SELECT name FROM sqlite_master WHERE type='index' AND tbl_name=?1 AND name NOT LIKE 'sqlite_%' ORDER BY name",
            [table],
        )
        .with_context(|| format!("Failed to list indexes of '{}'", table))
    }

    pub fn has_table(&self, table: &str) -> Result<bool> {
        let found = self
            .connection
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1",
                [table],
                |_| Ok(()),
            )
            .optional()
            .with_context(|| format!("Failed to look up table '{}'", table))?;
        Ok(found.is_some())
    }

    pub fn columns(&self, table: &str) -> Result<Vec<TableColumn>> {
        let mut stmt = self
            .connection
            .prepare("SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map([table], |row| {
                Ok(TableColumn {
                    name: row.get(0)?,
                    column_type: row.get(1)?,
                    notnull: row.get(2)?,
                    pk: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read columns of '{}'", table))?;

        if columns.is_empty() {
            bail!("Table does not exist: {}", table);
        }
        Ok(columns)
    }

    pub fn row_count(&self, table: &str) -> Result<u64> {
        if !self.has_table(table)? {
            bail!("Table does not exist: {}", table);
        }
        // Table names come from sqlite_master, quotes inside them are doubled.
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", table.replace('"', "\"\""));
        let count: i64 = self
            .connection
            .query_row(&sql, [], |row| row.get(0))
            .with_context(|| format!("Failed to count rows of '{}'", table))?;
        Ok(count.max(0) as u64)
    }

    /// Lists everything wrong with the color table's shape
    pub fn check_colors_table(&self) -> Result<Vec<String>> {
        if !self.has_table(COLORS_TABLE)? {
            return Ok(vec![format!("Table '{}' does not exist", COLORS_TABLE)]);
        }

        let columns = self.columns(COLORS_TABLE)?;
        let mut issues: Vec<String> = ["r", "g", "b", "name"]
            .into_iter()
            .filter(|required| !columns.iter().any(|c| c.name == *required))
            .map(|missing| format!("Required column '{}' is missing", missing))
            .collect();

        let mut key: Vec<&TableColumn> = columns.iter().filter(|c| c.pk > 0).collect();
        key.sort_by_key(|c| c.pk);
        let key: Vec<&str> = key.into_iter().map(|c| c.name.as_str()).collect();
        if key != ["r", "g", "b"] {
            issues.push(format!("Primary key is ({}), expected (r, g, b)", key.join(", ")));
        }

        if !self.indexes(COLORS_TABLE)?.iter().any(|name| name == RGB_INDEX) {
            issues.push(format!("Index '{}' is missing", RGB_INDEX));
        }

        Ok(issues)
    }

    pub fn print_database_report(&self) -> Result<()> {
        let tables = self.tables()?;
        info!("Database holds {} table(s)", tables.len());

        for table in &tables {
            info!("Table {} ({} rows)", table, self.row_count(table)?);
            for column in self.columns(table)? {
                let nullability = if column.notnull { "NOT NULL" } else { "NULL" };
                let key = if column.pk > 0 { " PRIMARY KEY" } else { "" };
                info!("  {} {} {}{}", column.name, column.column_type, nullability, key);
            }
            for index in self.indexes(table)? {
                info!("  index {}", index);
            }
        }

        Ok(())
    }

    fn names<P: rusqlite::Params>(&self, sql: &str, params: P) -> rusqlite::Result<Vec<String>> {
        let mut stmt = self.connection.prepare(sql)?;
        let names = stmt.query_map(params, |row| row.get(0))?.collect();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::SchemaManager;
    use tempfile::tempdir;

    #[test]
    fn test_fresh_schema_has_no_issues() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("colors.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            SchemaManager::new(&conn).ensure_schema().unwrap();
            conn.execute("INSERT INTO colors VALUES (1, 2, 3, 'x')", []).unwrap();
        }

        let inspector = DbInspector::new(&db_path).unwrap();
        assert_eq!(inspector.tables().unwrap(), vec!["colors".to_string()]);
        assert_eq!(inspector.row_count("colors").unwrap(), 1);
        assert_eq!(inspector.indexes("colors").unwrap(), vec!["idx_rgb".to_string()]);

        let columns = inspector.columns("colors").unwrap();
        assert_eq!(columns.len(), 4);
        assert!(columns.iter().all(|c| c.notnull));
        assert!(inspector.check_colors_table().unwrap().is_empty());
        inspector.print_database_report().unwrap();
    }

    #[test]
    fn test_reports_foreign_shape() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("colors.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute("CREATE TABLE colors (id INTEGER PRIMARY KEY, name TEXT)", [])
                .unwrap();
        }

        let issues = DbInspector::new(&db_path).unwrap().check_colors_table().unwrap();
        assert!(issues.iter().any(|issue| issue.contains("'r'")));
        assert!(issues.iter().any(|issue| issue.contains("Primary key")));
        assert!(issues.iter().any(|issue| issue.contains("idx_rgb")));
    }

    #[test]
    fn test_unknown_table_is_an_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("empty.db");
        Connection::open(&db_path)
            .unwrap()
            .execute_batch("CREATE TABLE other (x INTEGER)")
            .unwrap();

        let inspector = DbInspector::new(&db_path).unwrap();
        assert!(!inspector.has_table("colors").unwrap());
        assert!(inspector.columns("colors").is_err());
        assert!(inspector.row_count("colors").is_err());
        assert_eq!(
            inspector.check_colors_table().unwrap(),
            vec!["Table 'colors' does not exist".to_string()]
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(DbInspector::new(&dir.path().join("absent.db")).is_err());
    }
}
