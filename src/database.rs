use crate::model::{Priority, Task, Workspace};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use tracing::debug;

impl Task {
    pub fn from_row(row: &Row) -> Result<Self> {
        let tags: Option<String> = row.get(5)?;
        let due_date: Option<String> = row.get(6)?;
        let priority: i64 = row.get(7)?;
        Ok(Task {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            workspace_id: row.get(2)?,
            title: row.get(3)?,
            completed: row.get(4)?,
            tags: split_tags(tags.as_deref().unwrap_or("")),
            due_date: due_date.unwrap_or_default(),
            priority: Priority::from_i64(priority),
            order: row.get(8)?,
            created_at: row.get(9)?,
            children: Vec::new(),
        })
    }
}

impl Workspace {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Workspace {
            id: row.get(0)?,
            name: row.get(1)?,
            order: row.get(2)?,
            task_count: row.get(3)?,
            completed_count: row.get(4)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub workspace_id: i64,
    pub parent_id: Option<i64>,
    pub title: String,
    pub tags: Vec<String>,
    pub due_date: String,
    pub priority: Priority,
}

const TASK_COLUMNS: &str =
    "id, parent_id, workspace_id, title, completed, tags, due_date, priority, task_order, created_at";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(db_path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(db_path)?;
        let db = Database { conn };
        db.configure()?;
        db.create_tables()?;
        debug!(path = db_path, "store opened");
        Ok(db)
    }

    fn configure(&self) -> anyhow::Result<()> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        // Deleting a workspace or a parent task relies on ON DELETE CASCADE.
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS workspaces (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                ws_order INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER,
                workspace_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                tags TEXT,
                due_date TEXT,
                priority INTEGER NOT NULL DEFAULT 0,
                task_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (parent_id) REFERENCES tasks (id) ON DELETE CASCADE,
                FOREIGN KEY (workspace_id) REFERENCES workspaces (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_workspace ON tasks (workspace_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks (parent_id);
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT
            );",
        )
    }

    pub fn get_setting(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value: Option<Option<String>> = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value.flatten())
    }

    pub fn set_setting(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn list_workspaces(&self) -> anyhow::Result<Vec<Workspace>> {
        let mut stmt = self.conn.prepare(
            "SELECT w.id, w.name, w.ws_order,
                (SELECT COUNT(*) FROM tasks WHERE workspace_id = w.id),
                (SELECT COUNT(*) FROM tasks WHERE workspace_id = w.id AND completed = 1)
             FROM workspaces w
             ORDER BY w.ws_order, w.id",
        )?;
        let rows = stmt.query_map([], |row| Workspace::from_row(row))?;

        let mut workspaces = Vec::new();
        for workspace in rows {
            workspaces.push(workspace?);
        }
        Ok(workspaces)
    }

    pub fn create_workspace(&self, name: &str) -> anyhow::Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        let order: i64 = tx.query_row(
            "SELECT COALESCE(MAX(ws_order), -1) + 1 FROM workspaces",
            [],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO workspaces (name, ws_order) VALUES (?1, ?2)",
            params![name, order],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        debug!(id, name, "workspace created");
        Ok(id)
    }

    pub fn rename_workspace(&self, id: i64, name: &str) -> anyhow::Result<()> {
        self.conn
            .execute("UPDATE workspaces SET name = ?1 WHERE id = ?2", params![name, id])?;
        Ok(())
    }

    pub fn delete_workspace(&self, id: i64) -> anyhow::Result<()> {
        self.conn.execute("DELETE FROM workspaces WHERE id = ?1", params![id])?;
        debug!(id, "workspace deleted");
        Ok(())
    }

    /// All tasks of a workspace, flat, in sibling order. `TaskTree::from_tasks` links them.
    pub fn list_tasks_for_workspace(&self, workspace_id: i64) -> anyhow::Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE workspace_id = ?1
             ORDER BY task_order, id"
        ))?;
        let rows = stmt.query_map([workspace_id], |row| Task::from_row(row))?;

        let mut tasks = Vec::new();
        for task in rows {
            tasks.push(task?);
        }
        Ok(tasks)
    }

    pub fn get_task(&self, id: i64) -> anyhow::Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                [id],
                |row| Task::from_row(row),
            )
            .optional()?;
        Ok(task)
    }

    pub fn create_task(&self, new_task: NewTask) -> anyhow::Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        let order = next_sibling_order(&tx, new_task.workspace_id, new_task.parent_id)?;
        tx.execute(
            "INSERT INTO tasks (workspace_id, parent_id, title, task_order, tags, due_date, priority, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new_task.workspace_id,
                new_task.parent_id,
                new_task.title,
                order,
                join_tags(&new_task.tags),
                null_if_empty(&new_task.due_date),
                new_task.priority.as_i64(),
                Utc::now(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        debug!(id, workspace_id = new_task.workspace_id, "task created");
        Ok(id)
    }

    /// Persists title, completed, tags, due date and priority.
    pub fn update_task(&self, task: &Task) -> anyhow::Result<()> {
        self.conn.execute(
            "UPDATE tasks SET title = ?1, completed = ?2, tags = ?3, due_date = ?4, priority = ?5
             WHERE id = ?6",
            params![
                task.title,
                task.completed,
                join_tags(&task.tags),
                null_if_empty(&task.due_date),
                task.priority.as_i64(),
                task.id
            ],
        )?;
        Ok(())
    }

    pub fn delete_task(&self, id: i64) -> anyhow::Result<()> {
        self.conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        debug!(id, "task deleted");
        Ok(())
    }

    pub fn set_task_completed(&self, id: i64, completed: bool) -> anyhow::Result<()> {
        self.conn.execute(
            "UPDATE tasks SET completed = ?1 WHERE id = ?2",
            params![completed, id],
        )?;
        Ok(())
    }

    /// Bulk completion write used by group toggles. Applied in one transaction.
    pub fn set_tasks_completed(&self, updates: &[(i64, bool)]) -> anyhow::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare("UPDATE tasks SET completed = ?1 WHERE id = ?2")?;
            for (id, completed) in updates {
                stmt.execute(params![completed, id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Reparents a task, appending it after its new siblings.
    pub fn move_task(&self, id: i64, new_parent_id: Option<i64>) -> anyhow::Result<()> {
        if let Some(parent_id) = new_parent_id {
            if self.would_create_cycle(id, parent_id)? {
                return Err(anyhow::anyhow!("Cannot move task: would create a cycle"));
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        let workspace_id: i64 = tx.query_row(
            "SELECT workspace_id FROM tasks WHERE id = ?1",
            [id],
            |row| row.get(0),
        )?;
        let order = next_sibling_order(&tx, workspace_id, new_parent_id)?;
        tx.execute(
            "UPDATE tasks SET parent_id = ?1, task_order = ?2 WHERE id = ?3",
            params![new_parent_id, order, id],
        )?;
        tx.commit()?;
        debug!(id, ?new_parent_id, "task moved");
        Ok(())
    }

    fn would_create_cycle(&self, task_id: i64, potential_parent_id: i64) -> anyhow::Result<bool> {
        if task_id == potential_parent_id {
            return Ok(true);
        }

        // Walk up from the new parent; meeting the moved task means it would become its own ancestor.
        let mut current_id = Some(potential_parent_id);
        while let Some(id) = current_id {
            match self.get_task(id)? {
                Some(task) => {
                    current_id = task.parent_id;
                    if current_id == Some(task_id) {
                        return Ok(true);
                    }
                }
                None => break,
            }
        }

        Ok(false)
    }

    /// Force a full checkpoint and truncate the WAL file (for app shutdown)
    pub fn checkpoint_and_close(&self) -> anyhow::Result<()> {
        self.conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        Ok(())
    }

    /// Runs raw SQL against the store, for setting up failure cases in tests.
    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> anyhow::Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

fn next_sibling_order(conn: &Connection, workspace_id: i64, parent_id: Option<i64>) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(task_order), -1) + 1 FROM tasks
         WHERE workspace_id = ?1 AND parent_id IS ?2",
        params![workspace_id, parent_id],
        |row| row.get(0),
    )
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

fn null_if_empty(value: &str) -> Option<&str> {
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn new_task(workspace_id: i64, parent_id: Option<i64>, title: &str) -> NewTask {
        NewTask {
            workspace_id,
            parent_id,
            title: title.to_string(),
            tags: Vec::new(),
            due_date: String::new(),
            priority: Priority::Normal,
        }
    }

    #[test]
    fn sibling_order_is_dense_per_parent() -> anyhow::Result<()> {
        let db = Database::new(":memory:")?;
        let ws = db.create_workspace("Home")?;
        let a = db.create_task(new_task(ws, None, "a"))?;
        let b = db.create_task(new_task(ws, None, "b"))?;
        let a1 = db.create_task(new_task(ws, Some(a), "a1"))?;

        let order = |id| db.get_task(id).map(|t| t.map(|t| t.order));
        assert_eq!(order(a)?, Some(0));
        assert_eq!(order(b)?, Some(1));
        assert_eq!(order(a1)?, Some(0));
        Ok(())
    }

    #[test]
    fn task_fields_round_trip_through_the_store() -> anyhow::Result<()> {
        let db = Database::new(":memory:")?;
        let ws = db.create_workspace("Home")?;
        let id = db.create_task(NewTask {
            tags: vec!["grocery".to_string(), "urgent".to_string()],
            due_date: "2026-10-17".to_string(),
            priority: Priority::High,
            ..new_task(ws, None, "Buy milk")
        })?;

        let task = db.get_task(id)?.expect("task exists");
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.tags, vec!["grocery".to_string(), "urgent".to_string()]);
        assert_eq!(task.due_date, "2026-10-17");
        assert_eq!(task.priority, Priority::High);
        assert!(!task.completed);
        Ok(())
    }

    #[test]
    fn move_appends_to_new_siblings_and_rejects_cycles() -> anyhow::Result<()> {
        let db = Database::new(":memory:")?;
        let ws = db.create_workspace("Home")?;
        let a = db.create_task(new_task(ws, None, "a"))?;
        let _a1 = db.create_task(new_task(ws, Some(a), "a1"))?;
        let b = db.create_task(new_task(ws, None, "b"))?;

        db.move_task(b, Some(a))?;
        let moved = db.get_task(b)?.expect("task exists");
        assert_eq!(moved.parent_id, Some(a));
        assert_eq!(moved.order, 1);

        assert!(db.move_task(a, Some(b)).is_err());
        assert_eq!(db.get_task(a)?.expect("task exists").parent_id, None);
        Ok(())
    }

    #[test]
    fn deleting_cascades_to_subtree_and_workspace_tasks() -> anyhow::Result<()> {
        let db = Database::new(":memory:")?;
        let ws = db.create_workspace("Home")?;
        let a = db.create_task(new_task(ws, None, "a"))?;
        let a1 = db.create_task(new_task(ws, Some(a), "a1"))?;
        let a1x = db.create_task(new_task(ws, Some(a1), "a1x"))?;
        let b = db.create_task(new_task(ws, None, "b"))?;

        db.delete_task(a)?;
        assert!(db.get_task(a1)?.is_none());
        assert!(db.get_task(a1x)?.is_none());
        assert!(db.get_task(b)?.is_some());

        db.delete_workspace(ws)?;
        assert!(db.get_task(b)?.is_none());
        Ok(())
    }

    #[test]
    fn workspace_counters_and_settings() -> anyhow::Result<()> {
        let db = Database::new(":memory:")?;
        let ws = db.create_workspace("Home")?;
        let _second = db.create_workspace("Work")?;
        let a = db.create_task(new_task(ws, None, "a"))?;
        let b = db.create_task(new_task(ws, None, "b"))?;
        db.set_tasks_completed(&[(a, true), (b, false)])?;

        let workspaces = db.list_workspaces()?;
        assert_eq!(workspaces.len(), 2);
        assert_eq!(workspaces[0].name, "Home");
        assert_eq!(workspaces[0].task_count, 2);
        assert_eq!(workspaces[0].completed_count, 1);
        assert_eq!(workspaces[1].order, 1);

        assert_eq!(db.get_setting("weather_unit")?, None);
        db.set_setting("weather_unit", "c")?;
        db.set_setting("weather_unit", "f")?;
        assert_eq!(db.get_setting("weather_unit")?, Some("f".to_string()));
        Ok(())
    }

    #[test]
    fn checkpoint_truncates_the_wal_and_keeps_data() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("td.db");
        let path = path.to_string_lossy();
        {
            let db = Database::new(&path)?;
            let ws = db.create_workspace("Home")?;
            db.create_task(new_task(ws, None, "kept"))?;
            db.checkpoint_and_close()?;
        }

        let wal = dir.path().join("td.db-wal");
        assert!(!wal.exists() || std::fs::metadata(&wal)?.len() == 0);

        let db = Database::new(&path)?;
        let ws = db.list_workspaces()?[0].id;
        assert_eq!(db.list_tasks_for_workspace(ws)?.len(), 1);
        Ok(())
    }
}
