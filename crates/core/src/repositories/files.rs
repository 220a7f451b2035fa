use crate::models::FileRecord;
use sqlx::SqliteConnection;
use uuid::Uuid;

pub async fn insert(conn: &mut SqliteConnection, file: &FileRecord) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO files (id, server_filename, original_filename, storage_path, content_type, size_bytes, sha256, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(file.id)
    .bind(&file.server_filename)
    .bind(&file.original_filename)
    .bind(&file.storage_path)
    .bind(&file.content_type)
    .bind(file.size_bytes)
    .bind(&file.sha256)
    .bind(file.created_at)
    .bind(file.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: Uuid) -> sqlx::Result<Option<FileRecord>> {
    sqlx::query_as::<_, FileRecord>(
        "SELECT id, server_filename, original_filename, storage_path, content_type, size_bytes, sha256, created_at, updated_at
         FROM files WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// Deletes the row; returns whether one existed.
pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM files WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
