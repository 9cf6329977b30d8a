//! Geometry lookups keyed by USRN.

use sqlx::SqlitePool;

use streetwise_common::Result;

/// Fetch the stored WKT geometry for a USRN, if any.
///
/// Schema and table names come from deployment configuration and are
/// validated as plain identifiers when the configuration is resolved.
pub async fn geometry_for_usrn(
    pool: &SqlitePool,
    schema: &str,
    table: &str,
    usrn: &str,
) -> Result<Option<String>> {
    let sql = format!("SELECT geometry FROM {schema}.{table} WHERE usrn = ?");
    tracing::debug!(usrn, "Executing geometry lookup");

    let geometry = sqlx::query_scalar::<_, String>(&sql)
        .bind(usrn)
        .fetch_optional(pool)
        .await?;

    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn seeded_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE usrn_geometries (usrn TEXT PRIMARY KEY, geometry TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO usrn_geometries (usrn, geometry) VALUES (?, ?)")
            .bind("12345678")
            .bind("LINESTRING (0 0, 100 0)")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn returns_geometry_for_known_usrn() {
        let pool = seeded_pool().await;
        let geometry = geometry_for_usrn(&pool, "main", "usrn_geometries", "12345678")
            .await
            .unwrap();
        assert_eq!(geometry.as_deref(), Some("LINESTRING (0 0, 100 0)"));
    }

    #[tokio::test]
    async fn returns_none_for_unknown_usrn() {
        let pool = seeded_pool().await;
        let geometry = geometry_for_usrn(&pool, "main", "usrn_geometries", "99999999")
            .await
            .unwrap();
        assert!(geometry.is_none());
    }

    #[tokio::test]
    async fn missing_table_is_a_store_error() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let err = geometry_for_usrn(&pool, "main", "usrn_geometries", "12345678")
            .await
            .unwrap_err();
        assert!(matches!(err, streetwise_common::Error::Store(_)));
    }
}
