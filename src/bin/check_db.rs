use sqlx::postgres::PgPool;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;

    println!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    for table in ["accounts", "profiles"] {
        let result = sqlx::query_as::<_, (i64,)>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await;
        match result {
            Ok((rows,)) => println!("✅ {table} table exists ({rows} rows)"),
            Err(e) => println!("❌ {table} table NOT FOUND: {e}"),
        }
    }

    let tables = sqlx::query_as::<_, (String,)>(
        "SELECT tablename FROM pg_tables WHERE schemaname = 'public' ORDER BY tablename",
    )
    .fetch_all(&pool)
    .await?;
    println!("\nAvailable tables:");
    for (table,) in tables {
        println!("  - {}", table);
    }

    println!("\nApplied migrations:");
    let migrations = sqlx::query_as::<_, (i64, String, bool)>(
        "SELECT version, description, success FROM _sqlx_migrations ORDER BY version DESC",
    )
    .fetch_all(&pool)
    .await;
    match migrations {
        Ok(migrations) => {
            for (version, description, success) in migrations {
                println!("  - {} {} (success: {})", version, description, success);
            }
        }
        Err(e) => println!("❌ Error querying _sqlx_migrations: {}", e),
    }

    pool.close().await;
    Ok(())
}
