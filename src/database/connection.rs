use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use tracing::{trace, trace_span};

use crate::config::Config;
use crate::store::StoreError;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub fn establish_pooled_connection(config: &Config) -> Result<PgPool, StoreError> {
    let span = trace_span!("establishing pooled connection");
    let _guard = span.enter();

    trace!("Creating manager");
    let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

    trace!("Creating pool of {} connections", config.pool_size);
    let pool = Pool::builder()
        .max_size(config.pool_size)
        .build(manager)?;

    Ok(pool)
}
