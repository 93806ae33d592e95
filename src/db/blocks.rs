use super::{conversion_error, local_today, timestamp_at, Assignments, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{Block, BlockPatch, NewBlock, RecordKind};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

const SELECT_BLOCK: &str = "SELECT id, type, content, related_id, created_at FROM blocks";

// Block days are local calendar days; created_at itself is stored in UTC.
impl Database {
    /// Blocks created today, oldest first.
    pub fn list_blocks(&self) -> AppResult<Vec<Block>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(&format!(
            "{} WHERE DATE(created_at, 'localtime') = ?1 ORDER BY created_at ASC, rowid ASC",
            SELECT_BLOCK
        ))?;
        let blocks = statement
            .query_map([local_today()], parse_block_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(blocks)
    }

    pub fn get_block(&self, id: &str) -> AppResult<Option<Block>> {
        let conn = self.conn()?;
        block_by_id(&conn, id)
    }

    /// Inserts a block under the caller's id; a duplicate id is a constraint
    /// error from SQLite.
    pub fn create_block(&self, block: NewBlock) -> AppResult<Block> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO blocks (id, type, content, related_id) VALUES (?1, ?2, ?3, ?4)",
            params![block.id, block.kind.as_str(), block.content, block.related_id],
        )?;

        tracing::debug!(id = %block.id, kind = block.kind.as_str(), "block created");
        block_by_id(&conn, &block.id)?
            .ok_or_else(|| AppError::CreateFailed(format!("block {} not readable after insert", block.id)))
    }

    pub fn update_block(&self, id: &str, patch: BlockPatch) -> AppResult<()> {
        let mut assignments = Assignments::new();
        if let Some(content) = patch.content {
            assignments.set("content", content);
        }
        if let Some(related_id) = patch.related_id {
            assignments.set("related_id", related_id);
        }
        if assignments.is_empty() {
            return Ok(());
        }

        let conn = self.conn()?;
        assignments.apply(&conn, "blocks", id.to_string())?;
        Ok(())
    }

    pub fn delete_block(&self, id: &str) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM blocks WHERE id = ?1", [id])?;
        Ok(())
    }

    pub fn delete_all_blocks(&self) -> AppResult<()> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM blocks", [])?;
        tracing::info!(count = removed, "cleared block workspace");
        Ok(())
    }

    /// Physically removes every block whose local creation day is before `today`.
    pub fn purge_blocks_before(&self, today: NaiveDate) -> AppResult<u64> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM blocks WHERE DATE(created_at, 'localtime') < ?1",
            [today],
        )?;
        Ok(removed as u64)
    }
}

fn block_by_id(conn: &Connection, id: &str) -> AppResult<Option<Block>> {
    conn.query_row(&format!("{} WHERE id = ?1", SELECT_BLOCK), [id], parse_block_row)
        .optional()
        .map_err(AppError::from)
}

fn parse_block_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Block> {
    let raw_kind: String = row.get(1)?;
    let kind = RecordKind::parse(&raw_kind)
        .ok_or_else(|| conversion_error(1, format!("unknown block type '{}'", raw_kind)))?;
    Ok(Block {
        id: row.get(0)?,
        kind,
        content: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        related_id: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
    })
}
