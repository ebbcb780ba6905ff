//! `PostgreSQL` repository for the canteen ordering engine.
//!
//! Carts, orders and favorites are stored as JSONB documents next to a
//! `version` column. Every write names the version it read, so the engine's
//! compare-and-swap loop works unchanged against the database:
//!
//! - Cart and order updates are `UPDATE ... WHERE version = $expected`
//! - Checkout inserts the order and resets the cart in one transaction
//! - Pickup codes are unique at the database level
//!
//! # Example
//!
//! ```ignore
//! use canteen_postgres::PostgresRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let repository = PostgresRepository::connect("postgres://localhost/canteen", 10).await?;
//!     repository.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use canteen_core::BoxFuture;
use canteen_core::cart::Cart;
use canteen_core::order::Order;
use canteen_core::repository::{Repository, RepositoryError, RepositoryResult, Version, Versioned};
use canteen_core::types::{ItemId, OrderId, UserId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};

const ORDERS_PRIMARY_KEY: &str = "orders_pkey";
const ORDERS_PICKUP_CODE_KEY: &str = "orders_pickup_code_key";

/// Schema, applied statement by statement. Every statement is idempotent.
const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS carts (
        user_id TEXT PRIMARY KEY,
        version BIGINT NOT NULL,
        body JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS orders (
        id TEXT NOT NULL,
        seq BIGSERIAL NOT NULL,
        user_id TEXT NOT NULL,
        pickup_code TEXT NOT NULL,
        status TEXT NOT NULL,
        version BIGINT NOT NULL,
        body JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        CONSTRAINT orders_pkey PRIMARY KEY (id),
        CONSTRAINT orders_pickup_code_key UNIQUE (pickup_code)
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id, seq)",
    "CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status)",
    r"
    CREATE TABLE IF NOT EXISTS favorites (
        user_id TEXT NOT NULL,
        item_id TEXT NOT NULL,
        seq BIGSERIAL NOT NULL,
        PRIMARY KEY (user_id, item_id)
    )
    ",
];

fn backend(err: sqlx::Error) -> RepositoryError {
    tracing::error!(error = %err, "Database error");
    RepositoryError::Backend(err.to_string())
}

fn to_json<T: Serialize>(value: &T) -> RepositoryResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

fn from_json<T: DeserializeOwned>(value: serde_json::Value) -> RepositoryResult<T> {
    serde_json::from_value(value).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

fn to_db(version: Version) -> RepositoryResult<i64> {
    i64::try_from(version.value())
        .map_err(|_| RepositoryError::Serialization(format!("version {version} out of range")))
}

fn from_db(version: i64) -> RepositoryResult<Version> {
    u64::try_from(version)
        .map(Version::new)
        .map_err(|_| RepositoryError::Serialization(format!("negative version {version}")))
}

fn conflict(table: &'static str, key: String, expected: Version, actual: Version) -> RepositoryError {
    metrics::counter!("canteen_postgres_conflicts_total", "table" => table).increment(1);
    tracing::debug!(key = %key, %expected, %actual, "Version conflict");
    RepositoryError::Conflict {
        key,
        expected,
        actual,
    }
}

async fn cart_version(conn: &mut PgConnection, user_id: &UserId) -> RepositoryResult<Version> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM carts WHERE user_id = $1")
        .bind(user_id.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(backend)?;
    row.map_or(Ok(Version::INITIAL), |(v,)| from_db(v))
}

/// Write `cart` if its stored version is still `expected`.
async fn write_cart(conn: &mut PgConnection, cart: &Cart, expected: Version) -> RepositoryResult<Version> {
    let next = expected.next();
    let body = to_json(cart)?;

    let result = if expected == Version::INITIAL {
        sqlx::query(
            r"
            INSERT INTO carts (user_id, version, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(cart.user_id().as_str())
        .bind(to_db(next)?)
        .bind(body)
        .execute(&mut *conn)
        .await
    } else {
        sqlx::query(
            r"
            UPDATE carts SET version = $2, body = $3, updated_at = now()
            WHERE user_id = $1 AND version = $4
            ",
        )
        .bind(cart.user_id().as_str())
        .bind(to_db(next)?)
        .bind(body)
        .bind(to_db(expected)?)
        .execute(&mut *conn)
        .await
    }
    .map_err(backend)?;

    if result.rows_affected() == 0 {
        let actual = cart_version(conn, cart.user_id()).await?;
        return Err(conflict("carts", format!("cart/{}", cart.user_id()), expected, actual));
    }
    Ok(next)
}

fn insert_error(err: sqlx::Error, order: &Order) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        match db.constraint() {
            Some(ORDERS_PRIMARY_KEY) => return RepositoryError::DuplicateOrder(order.id().clone()),
            Some(ORDERS_PICKUP_CODE_KEY) => {
                return RepositoryError::DuplicatePickupCode(order.pickup_code().clone());
            },
            _ => {},
        }
    }
    backend(err)
}

/// [`Repository`] backed by a `PostgreSQL` connection pool.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Connect with a pool of at most `max_connections`.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Backend`] if the database cannot be reached.
    pub async fn connect(database_url: &str, max_connections: u32) -> RepositoryResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(backend)?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables and indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Backend`] if a statement fails.
    pub async fn migrate(&self) -> RepositoryResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await.map_err(backend)?;
        }
        tracing::info!("Database schema ready");
        Ok(())
    }
}

impl Repository for PostgresRepository {
    fn load_cart<'a>(&'a self, user_id: &'a UserId) -> BoxFuture<'a, RepositoryResult<Versioned<Cart>>> {
        Box::pin(async move {
            let row: Option<(i64, serde_json::Value)> =
                sqlx::query_as("SELECT version, body FROM carts WHERE user_id = $1")
                    .bind(user_id.as_str())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(backend)?;

            match row {
                Some((version, body)) => Ok(Versioned::new(from_json(body)?, from_db(version)?)),
                None => Ok(Versioned::new(Cart::new(user_id.clone()), Version::INITIAL)),
            }
        })
    }

    fn save_cart<'a>(&'a self, cart: &'a Cart, expected: Version) -> BoxFuture<'a, RepositoryResult<Version>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(backend)?;
            write_cart(&mut conn, cart, expected).await
        })
    }

    fn commit_checkout<'a>(&'a self, order: &'a Order, cart_version: Version) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(backend)?;

            write_cart(&mut tx, &Cart::new(order.user_id().clone()), cart_version).await?;

            sqlx::query(
                r"
                INSERT INTO orders (id, user_id, pickup_code, status, version, body, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(order.id().as_str())
            .bind(order.user_id().as_str())
            .bind(order.pickup_code().as_str())
            .bind(order.status().as_str())
            .bind(to_db(Version::INITIAL.next())?)
            .bind(to_json(order)?)
            .bind(order.created_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| insert_error(e, order))?;

            tx.commit().await.map_err(backend)?;
            Ok(())
        })
    }

    fn load_order<'a>(&'a self, order_id: &'a OrderId) -> BoxFuture<'a, RepositoryResult<Option<Versioned<Order>>>> {
        Box::pin(async move {
            let row: Option<(i64, serde_json::Value)> =
                sqlx::query_as("SELECT version, body FROM orders WHERE id = $1")
                    .bind(order_id.as_str())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(backend)?;

            match row {
                Some((version, body)) => Ok(Some(Versioned::new(from_json(body)?, from_db(version)?))),
                None => Ok(None),
            }
        })
    }

    fn save_order<'a>(&'a self, order: &'a Order, expected: Version) -> BoxFuture<'a, RepositoryResult<Version>> {
        Box::pin(async move {
            let next = expected.next();
            let result = sqlx::query(
                r"
                UPDATE orders SET version = $2, status = $3, body = $4
                WHERE id = $1 AND version = $5
                ",
            )
            .bind(order.id().as_str())
            .bind(to_db(next)?)
            .bind(order.status().as_str())
            .bind(to_json(order)?)
            .bind(to_db(expected)?)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

            if result.rows_affected() == 1 {
                return Ok(next);
            }

            let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM orders WHERE id = $1")
                .bind(order.id().as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
            match row {
                Some((actual,)) => Err(conflict(
                    "orders",
                    format!("order/{}", order.id()),
                    expected,
                    from_db(actual)?,
                )),
                // Orders are only created by `commit_checkout`.
                None => Err(RepositoryError::Backend(format!("order {} does not exist", order.id()))),
            }
        })
    }

    fn list_orders<'a>(&'a self, user_id: Option<&'a UserId>) -> BoxFuture<'a, RepositoryResult<Vec<Order>>> {
        Box::pin(async move {
            let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
                r"
                SELECT body FROM orders
                WHERE ($1::TEXT IS NULL OR user_id = $1)
                ORDER BY seq
                ",
            )
            .bind(user_id.map(UserId::as_str))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

            rows.into_iter().map(|(body,)| from_json(body)).collect()
        })
    }

    fn add_favorite<'a>(&'a self, user_id: &'a UserId, item_id: &'a ItemId) -> BoxFuture<'a, RepositoryResult<bool>> {
        Box::pin(async move {
            let result = sqlx::query(
                "INSERT INTO favorites (user_id, item_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(user_id.as_str())
            .bind(item_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn remove_favorite<'a>(
        &'a self,
        user_id: &'a UserId,
        item_id: &'a ItemId,
    ) -> BoxFuture<'a, RepositoryResult<bool>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND item_id = $2")
                .bind(user_id.as_str())
                .bind(item_id.as_str())
                .execute(&self.pool)
                .await
                .map_err(backend)?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn list_favorites<'a>(&'a self, user_id: &'a UserId) -> BoxFuture<'a, RepositoryResult<Vec<ItemId>>> {
        Box::pin(async move {
            let rows: Vec<(String,)> =
                sqlx::query_as("SELECT item_id FROM favorites WHERE user_id = $1 ORDER BY seq")
                    .bind(user_id.as_str())
                    .fetch_all(&self.pool)
                    .await
                    .map_err(backend)?;
            Ok(rows.into_iter().map(|(id,)| ItemId::new(id)).collect())
        })
    }
}
