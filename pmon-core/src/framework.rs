use sqlx::PgPool;

/// Runs the entity queries (`impl Processor<Query> for DatabaseProcessor`).
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
