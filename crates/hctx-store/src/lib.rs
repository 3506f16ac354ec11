//! # hctx-store
//!
//! SQLite-backed [`KnowledgeStore`] for Hyper Context.
//!
//! Holds projects, the node forest, versions, and per-version contents:
//! - `nodes` ordered by `(parent_id, sort_order)` within a project
//! - `versions` with the draft → published → stable lifecycle
//! - `node_contents` / `version_contents` for raw node text and the main document
//!
//! Only the write operations needed to seed a project are provided; the
//! retrieval engine itself only reads through [`KnowledgeStore`].

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use hctx_core::error::{HctxError, Result};
use hctx_core::node::{build_tree, KnowledgeNode, NodeType};
use hctx_core::store::KnowledgeStore;
use hctx_core::version::{Version, VersionStatus};

fn db(e: rusqlite::Error) -> HctxError {
    HctxError::Store(e.to_string())
}

fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

const VERSION_COLUMNS: &str =
    "id, project_id, version, status, is_stable, created_at, notes, tree_snapshot";

/// A version row before its text columns are validated.
struct VersionRow {
    id: String,
    project_id: String,
    version: String,
    status: String,
    is_stable: bool,
    created_at: String,
    notes: Option<String>,
    tree_snapshot: Option<String>,
}

impl VersionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            version: row.get(2)?,
            status: row.get(3)?,
            is_stable: row.get(4)?,
            created_at: row.get(5)?,
            notes: row.get(6)?,
            tree_snapshot: row.get(7)?,
        })
    }

    fn into_version(self) -> Result<Version> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| HctxError::Store(format!("bad created_at '{}': {e}", self.created_at)))?
            .with_timezone(&Utc);
        Ok(Version {
            id: self.id,
            project_id: self.project_id,
            version: self.version,
            status: self.status.parse::<VersionStatus>()?,
            is_stable: self.is_stable,
            created_at,
            notes: self.notes,
            tree_snapshot: self.tree_snapshot,
        })
    }
}

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<(KnowledgeNode, String)> {
    Ok((
        KnowledgeNode {
            id: row.get(0)?,
            name: row.get(1)?,
            // Placeholder until the type column is validated below.
            node_type: NodeType::File,
            parent_id: row.get(3)?,
            sort_order: row.get(4)?,
        },
        row.get(2)?,
    ))
}

fn validate_node((mut node, node_type): (KnowledgeNode, String)) -> Result<KnowledgeNode> {
    node.node_type = node_type.parse()?;
    Ok(node)
}

/// Parse `x.y.z`; anything else is not semver for auto-bumping purposes.
fn parse_semver(v: &str) -> Option<(u64, u64, u64)> {
    let mut parts = v.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

/// Next free version label: the highest `x.y.z` with its patch bumped, or `0.0.1`.
fn next_version_label(existing: &[String]) -> String {
    let max = existing.iter().filter_map(|v| parse_semver(v)).max();
    let (major, minor, mut patch) = match max {
        Some((ma, mi, pa)) => (ma, mi, pa + 1),
        None => (0, 0, 1),
    };
    loop {
        let candidate = format!("{major}.{minor}.{patch}");
        if !existing.contains(&candidate) {
            return candidate;
        }
        patch += 1;
    }
}

/// SQLite database holding every project's knowledge.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`HctxError::Store`] if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(db)?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns [`HctxError::Store`] if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db)?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL REFERENCES projects(id),
                parent_id TEXT REFERENCES nodes(id),
                name TEXT NOT NULL,
                type TEXT NOT NULL CHECK (type IN ('file', 'folder')),
                sort_order INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS versions (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL REFERENCES projects(id),
                version TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'draft',
                is_stable INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                notes TEXT,
                tree_snapshot TEXT,
                UNIQUE (project_id, version)
            );

            CREATE TABLE IF NOT EXISTS node_contents (
                version_id TEXT NOT NULL REFERENCES versions(id),
                node_id TEXT NOT NULL REFERENCES nodes(id),
                content TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (version_id, node_id)
            );

            CREATE TABLE IF NOT EXISTS version_contents (
                version_id TEXT PRIMARY KEY REFERENCES versions(id),
                project_id TEXT NOT NULL REFERENCES projects(id),
                main TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_project ON nodes(project_id, parent_id, sort_order);
            CREATE INDEX IF NOT EXISTS idx_versions_project ON versions(project_id, created_at);
            ",
            )
            .map_err(db)?;
        Ok(())
    }

    /// Create a project and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`HctxError::InvalidInput`] for a blank name.
    pub fn create_project(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HctxError::InvalidInput("name is required".to_string()));
        }
        let id = new_id();
        self.conn
            .execute(
                "INSERT INTO projects (id, name, created_at) VALUES (?1, ?2, ?3)",
                params![id, name, now()],
            )
            .map_err(db)?;
        debug!(project_id = %id, name, "created project");
        Ok(id)
    }

    /// Create a node at the end of its parent's children.
    ///
    /// # Errors
    ///
    /// Returns [`HctxError::NotFound`] if the parent is missing or belongs to
    /// another project, [`HctxError::InvalidInput`] for a blank name or a
    /// parent that is not a folder.
    pub fn create_node(
        &self,
        project_id: &str,
        parent_id: Option<&str>,
        name: &str,
        node_type: NodeType,
    ) -> Result<KnowledgeNode> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HctxError::InvalidInput("name is required".to_string()));
        }
        if let Some(pid) = parent_id {
            let parent = self
                .get_node(project_id, pid)?
                .ok_or_else(|| HctxError::NotFound("Parent not found".to_string()))?;
            if !parent.is_folder() {
                return Err(HctxError::InvalidInput("Parent must be folder".to_string()));
            }
        }

        let sort_order: i64 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM nodes
                 WHERE project_id = ?1 AND parent_id IS ?2",
                params![project_id, parent_id],
                |row| row.get(0),
            )
            .map_err(db)?;

        let node = KnowledgeNode {
            id: new_id(),
            name: name.to_string(),
            node_type,
            parent_id: parent_id.map(str::to_string),
            sort_order,
        };
        self.conn
            .execute(
                "INSERT INTO nodes (id, project_id, parent_id, name, type, sort_order)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    node.id,
                    project_id,
                    node.parent_id,
                    node.name,
                    node.node_type.as_str(),
                    node.sort_order
                ],
            )
            .map_err(db)?;
        debug!(project_id, node_id = %node.id, name, "created node");
        Ok(node)
    }

    /// Create a draft version.
    ///
    /// A blank label picks the next patch after the highest `x.y.z` label.
    /// The draft starts with a copy of the contents of the latest published
    /// version, or of the most recent version when none is published.
    ///
    /// # Errors
    ///
    /// Returns [`HctxError::InvalidInput`] if the label already exists.
    pub fn create_version(
        &self,
        project_id: &str,
        label: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Version> {
        let existing: Vec<String> = {
            let mut stmt = self
                .conn
                .prepare("SELECT version FROM versions WHERE project_id = ?1")
                .map_err(db)?;
            let rows = stmt
                .query_map(params![project_id], |row| row.get(0))
                .map_err(db)?
                .collect::<rusqlite::Result<Vec<String>>>()
                .map_err(db)?;
            rows
        };

        let label = match label.map(str::trim).filter(|l| !l.is_empty()) {
            Some(l) if existing.iter().any(|e| e == l) => {
                return Err(HctxError::InvalidInput(
                    "Version already exists".to_string(),
                ))
            }
            Some(l) => l.to_string(),
            None => next_version_label(&existing),
        };

        let source = match self.latest_with_status(project_id, VersionStatus::Published)? {
            Some(v) => Some(v.id),
            None => self.latest_version(project_id)?.map(|v| v.id),
        };

        let id = new_id();
        let tx = self.conn.unchecked_transaction().map_err(db)?;
        tx.execute(
            "INSERT INTO versions (id, project_id, version, status, is_stable, created_at, notes)
             VALUES (?1, ?2, ?3, 'draft', 0, ?4, ?5)",
            params![id, project_id, label, now(), notes],
        )
        .map_err(db)?;
        if let Some(src) = &source {
            tx.execute(
                "INSERT INTO version_contents (version_id, project_id, main)
                 SELECT ?1, project_id, main FROM version_contents WHERE version_id = ?2",
                params![id, src],
            )
            .map_err(db)?;
            tx.execute(
                "INSERT INTO node_contents (version_id, node_id, content)
                 SELECT ?1, c.node_id, c.content FROM node_contents c
                 JOIN nodes n ON n.id = c.node_id
                 WHERE c.version_id = ?2 AND n.project_id = ?3",
                params![id, src, project_id],
            )
            .map_err(db)?;
        }
        tx.commit().map_err(db)?;
        debug!(project_id, version_id = %id, label = %label, cloned_from = ?source, "created draft");

        self.find_version(project_id, &id)?
            .ok_or_else(|| HctxError::Store(format!("version {id} vanished after insert")))
    }

    fn editable_version(&self, project_id: &str, version_id: &str) -> Result<Version> {
        let version = self
            .find_version(project_id, version_id)?
            .ok_or_else(|| HctxError::NotFound("Version not found".to_string()))?;
        if !version.is_editable() {
            return Err(HctxError::InvalidInput(
                "Only draft can be edited".to_string(),
            ));
        }
        Ok(version)
    }

    /// Replace the raw content of a node in a draft version.
    ///
    /// # Errors
    ///
    /// Returns [`HctxError::NotFound`] for an unknown version or node and
    /// [`HctxError::InvalidInput`] if the version is published.
    pub fn set_node_content(
        &self,
        project_id: &str,
        version_id: &str,
        node_id: &str,
        content: &str,
    ) -> Result<()> {
        self.editable_version(project_id, version_id)?;
        if self.get_node(project_id, node_id)?.is_none() {
            return Err(HctxError::NotFound("Node not found".to_string()));
        }
        self.conn
            .execute(
                "INSERT INTO node_contents (version_id, node_id, content) VALUES (?1, ?2, ?3)
                 ON CONFLICT (version_id, node_id) DO UPDATE SET content = excluded.content",
                params![version_id, node_id, content],
            )
            .map_err(db)?;
        Ok(())
    }

    /// Replace the main document of a draft version.
    ///
    /// # Errors
    ///
    /// Same as [`SqliteStore::set_node_content`].
    pub fn set_main_content(&self, project_id: &str, version_id: &str, content: &str) -> Result<()> {
        self.editable_version(project_id, version_id)?;
        self.conn
            .execute(
                "INSERT INTO version_contents (version_id, project_id, main) VALUES (?1, ?2, ?3)
                 ON CONFLICT (version_id) DO UPDATE SET main = excluded.main",
                params![version_id, project_id, content],
            )
            .map_err(db)?;
        Ok(())
    }

    /// Publish a draft, freezing the project's current tree into it.
    ///
    /// # Errors
    ///
    /// Returns [`HctxError::InvalidInput`] unless the version is a draft.
    pub fn publish(&self, project_id: &str, version_id: &str) -> Result<Version> {
        let version = self
            .find_version(project_id, version_id)?
            .ok_or_else(|| HctxError::NotFound("Version not found".to_string()))?;
        if version.status != VersionStatus::Draft {
            return Err(HctxError::InvalidInput(
                "Only draft can be published".to_string(),
            ));
        }
        let tree = build_tree(&self.list_nodes(project_id)?);
        let snapshot = serde_json::to_string(&tree)?;
        self.conn
            .execute(
                "UPDATE versions SET status = 'published', tree_snapshot = ?1 WHERE id = ?2",
                params![snapshot, version_id],
            )
            .map_err(db)?;
        debug!(project_id, version_id, "published version");
        self.find_version(project_id, version_id)?
            .ok_or_else(|| HctxError::NotFound("Version not found".to_string()))
    }

    /// Make a published version the project's only stable version.
    ///
    /// # Errors
    ///
    /// Returns [`HctxError::InvalidInput`] unless the version is published.
    pub fn mark_stable(&self, project_id: &str, version_id: &str) -> Result<()> {
        let version = self
            .find_version(project_id, version_id)?
            .ok_or_else(|| HctxError::NotFound("Version not found".to_string()))?;
        if version.status != VersionStatus::Published {
            return Err(HctxError::InvalidInput(
                "Only published can be stable".to_string(),
            ));
        }
        let tx = self.conn.unchecked_transaction().map_err(db)?;
        tx.execute(
            "UPDATE versions SET is_stable = 0 WHERE project_id = ?1 AND is_stable = 1",
            params![project_id],
        )
        .map_err(db)?;
        tx.execute(
            "UPDATE versions SET is_stable = 1 WHERE id = ?1",
            params![version_id],
        )
        .map_err(db)?;
        tx.commit().map_err(db)?;
        debug!(project_id, version_id, "marked stable");
        Ok(())
    }

    fn query_version(&self, sql: &str, args: impl rusqlite::Params) -> Result<Option<Version>> {
        self.conn
            .query_row(sql, args, VersionRow::from_row)
            .optional()
            .map_err(db)?
            .map(VersionRow::into_version)
            .transpose()
    }

    fn latest_with_status(&self, project_id: &str, status: VersionStatus) -> Result<Option<Version>> {
        self.query_version(
            &format!(
                "SELECT {VERSION_COLUMNS} FROM versions
                 WHERE project_id = ?1 AND status = ?2
                 ORDER BY created_at DESC, rowid DESC LIMIT 1"
            ),
            params![project_id, status.as_str()],
        )
    }

    fn latest_version(&self, project_id: &str) -> Result<Option<Version>> {
        self.query_version(
            &format!(
                "SELECT {VERSION_COLUMNS} FROM versions
                 WHERE project_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT 1"
            ),
            params![project_id],
        )
    }
}

impl KnowledgeStore for SqliteStore {
    fn project_name(&self, project_id: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT name FROM projects WHERE id = ?1",
                params![project_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db)
    }

    fn list_nodes(&self, project_id: &str) -> Result<Vec<KnowledgeNode>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, type, parent_id, sort_order FROM nodes
                 WHERE project_id = ?1
                 ORDER BY parent_id ASC, sort_order ASC, rowid ASC",
            )
            .map_err(db)?;
        let rows = stmt
            .query_map(params![project_id], node_from_row)
            .map_err(db)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db)?;
        rows.into_iter().map(validate_node).collect()
    }

    fn get_node(&self, project_id: &str, node_id: &str) -> Result<Option<KnowledgeNode>> {
        self.conn
            .query_row(
                "SELECT id, name, type, parent_id, sort_order FROM nodes
                 WHERE project_id = ?1 AND id = ?2",
                params![project_id, node_id],
                node_from_row,
            )
            .optional()
            .map_err(db)?
            .map(validate_node)
            .transpose()
    }

    fn stable_version(&self, project_id: &str) -> Result<Option<Version>> {
        self.query_version(
            &format!(
                "SELECT {VERSION_COLUMNS} FROM versions
                 WHERE project_id = ?1 AND is_stable = 1 LIMIT 1"
            ),
            params![project_id],
        )
    }

    fn latest_draft(&self, project_id: &str) -> Result<Option<Version>> {
        self.latest_with_status(project_id, VersionStatus::Draft)
    }

    fn find_version(&self, project_id: &str, version_id: &str) -> Result<Option<Version>> {
        self.query_version(
            &format!(
                "SELECT {VERSION_COLUMNS} FROM versions
                 WHERE project_id = ?1 AND id = ?2"
            ),
            params![project_id, version_id],
        )
    }

    fn node_content(&self, version_id: &str, node_id: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT content FROM node_contents WHERE version_id = ?1 AND node_id = ?2",
                params![version_id, node_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db)
    }

    fn main_content(&self, version_id: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT main FROM version_contents WHERE version_id = ?1",
                params![version_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db)
    }
}
