use anyhow::Result;
use bond_transactions::config::AppConfig;
use bond_transactions::projection::ProjectionStore;
use bond_transactions::repo::projections_repo::ProjectionsRepo;
use bond_transactions::store::postgres::PostgresEventStore;
use bond_transactions::store::EventStore;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cfg.database_url)
        .await?;

    let pg_store = PostgresEventStore { pool: pool.clone() };
    pg_store.ensure_schema().await?;
    let repo = ProjectionsRepo { pool };
    repo.ensure_schema().await?;

    let store = EventStore::postgres(pg_store);
    let projections = ProjectionStore::new();
    let rebuilt = projections.rebuild(&store).await?;

    let mut written = 0usize;
    for aggregate_id in store.aggregate_ids().await? {
        if let Some(row) = projections.get(aggregate_id) {
            repo.upsert(&row).await?;
            written += 1;
        }
    }

    tracing::info!("rebuilt {rebuilt} projections, wrote {written} rows");
    Ok(())
}
