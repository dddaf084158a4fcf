use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_postgres::{
    types::{ToSql, Type},
    Client, NoTls, Row,
};

/// One result row keyed by column name.
pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),
    #[error("database connection is closed")]
    Closed,
    #[error("column {column} has unsupported type {ty}")]
    UnsupportedColumn { column: String, ty: String },
    #[error("decode row failed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Positional value bound to a `$n` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
}

impl SqlParam {
    fn as_to_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            SqlParam::Text(value) => value,
            SqlParam::Int(value) => value,
        }
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

/// Parameterized statement execution against the interaction store.
///
/// Every call is a single attempt; failures are returned as-is and never retried.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Record>, StorageError>;

    /// Runs a statement that returns no rows, yielding the affected row count.
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, StorageError>;

    async fn ping(&self) -> Result<(), StorageError> {
        self.query("SELECT 1", &[]).await.map(|_| ())
    }
}

pub struct PgStorage {
    client: Client,
}

impl PgStorage {
    pub async fn connect(config: &tokio_postgres::Config) -> Result<Self, StorageError> {
        let (client, connection) = config.connect(NoTls).await?;
        tokio::spawn(async move {
            // Drive the connection in the background.
            if let Err(err) = connection.await {
                tracing::error!(error = %err, "database connection error");
            }
        });
        Ok(Self { client })
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Record>, StorageError> {
        if self.client.is_closed() {
            return Err(StorageError::Closed);
        }
        let bound: Vec<&(dyn ToSql + Sync)> = params.iter().map(SqlParam::as_to_sql).collect();
        let rows = self.client.query(sql, &bound).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, StorageError> {
        if self.client.is_closed() {
            return Err(StorageError::Closed);
        }
        let bound: Vec<&(dyn ToSql + Sync)> = params.iter().map(SqlParam::as_to_sql).collect();
        Ok(self.client.execute(sql, &bound).await?)
    }
}

fn row_to_record(row: &Row) -> Result<Record, StorageError> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = column_value(row, idx, column.type_()).ok_or_else(|| {
            StorageError::UnsupportedColumn {
                column: column.name().to_string(),
                ty: column.type_().to_string(),
            }
        })??;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

// Returns None when the column type has no JSON mapping; cast such columns in SQL.
fn column_value(row: &Row, idx: usize, ty: &Type) -> Option<Result<Value, StorageError>> {
    let value = if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty) {
        row.try_get::<_, Option<String>>(idx).map(|v| v.map(Value::String))
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx).map(|v| v.map(Value::from))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx).map(|v| v.map(Value::from))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx).map(|v| v.map(Value::from))
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx).map(|v| v.map(|v| Value::from(f64::from(v))))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx).map(|v| v.map(Value::from))
    } else if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx).map(|v| v.map(Value::Bool))
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<Value>>(idx)
    } else {
        return None;
    };
    Some(
        value
            .map(|v| v.unwrap_or(Value::Null))
            .map_err(StorageError::from),
    )
}
