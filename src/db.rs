use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::error::AppError;

pub type DbPool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<DbPool, AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> (DbPool, tempfile::TempDir) {
    let root = tempfile::TempDir::new().unwrap();
    let db_path = root.path().join("test.sqlite");
    std::fs::File::create(&db_path).unwrap();
    let pool = init_pool(&format!("sqlite://{}", db_path.to_string_lossy()))
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    (pool, root)
}
