//! SQLite persistence for the cleaned wine table

use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};

/// Store a DataFrame as a table in a SQLite database
///
/// The target directory is created if missing and the table is replaced if
/// it already exists. Every row is inserted inside a single transaction.
/// Booleans are stored as 0/1 integers.
///
/// # Arguments
/// * `df` - DataFrame to store
/// * `db_dir` - Directory holding the database file
/// * `db_name` - Database file name
/// * `table` - Target table name
///
/// # Returns
/// * Path of the database file, for later queries
pub fn store_dataframe(
    df: &DataFrame,
    db_dir: &str,
    db_name: &str,
    table: &str,
) -> crate::Result<PathBuf> {
    validate_identifier(table)?;

    fs::create_dir_all(db_dir)?;
    let db_path = Path::new(db_dir).join(db_name);

    let mut conn = Connection::open(&db_path)?;
    let tx = conn.transaction()?;

    tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{}\";", table))?;

    let column_defs: Vec<String> = df
        .get_columns()
        .iter()
        .map(|series| {
            validate_identifier(series.name())?;
            Ok(format!(
                "\"{}\" {}",
                series.name(),
                sql_type(series.dtype())?
            ))
        })
        .collect::<crate::Result<_>>()?;
    tx.execute(
        &format!("CREATE TABLE \"{}\" ({})", table, column_defs.join(", ")),
        [],
    )?;

    let column_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| format!("\"{}\"", name))
        .collect();
    let placeholders: Vec<String> = (1..=df.width()).map(|i| format!("?{}", i)).collect();
    let insert = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        table,
        column_names.join(", "),
        placeholders.join(", ")
    );

    {
        let mut stmt = tx.prepare(&insert)?;
        for row_idx in 0..df.height() {
            let row: Vec<SqlValue> = df
                .get_columns()
                .iter()
                .map(|series| any_value_to_sql(series.get(row_idx)?))
                .collect::<crate::Result<_>>()?;
            stmt.execute(params_from_iter(row.iter()))?;
        }
    }

    tx.commit()?;
    Ok(db_path)
}

/// Run a SQL query against a SQLite database and collect the result set
/// into a DataFrame
///
/// Column dtypes are inferred from the returned values: a column with any
/// REAL becomes Float64 (integers are widened), otherwise INTEGER values
/// make it Int64, otherwise TEXT. A column of only NULLs becomes Float64.
pub fn query_to_dataframe(db_path: &Path, query: &str) -> crate::Result<DataFrame> {
    let conn = Connection::open(db_path)?;
    let mut stmt = conn.prepare(query)?;

    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let n_columns = column_names.len();

    let mut columns: Vec<Vec<SqlValue>> = vec![Vec::new(); n_columns];
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for (idx, column) in columns.iter_mut().enumerate() {
            column.push(row.get::<_, SqlValue>(idx)?);
        }
    }

    let series: Vec<Series> = column_names
        .iter()
        .zip(columns)
        .map(|(name, values)| column_to_series(name, values))
        .collect::<crate::Result<_>>()?;

    Ok(DataFrame::new(series)?)
}

/// Map a Polars dtype to its SQLite storage class
fn sql_type(dtype: &DataType) -> crate::Result<&'static str> {
    match dtype {
        DataType::Float32 | DataType::Float64 => Ok("REAL"),
        DataType::Boolean
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => Ok("INTEGER"),
        DataType::Utf8 => Ok("TEXT"),
        other => anyhow::bail!("Unsupported dtype for SQLite storage: {:?}", other),
    }
}

fn any_value_to_sql(value: AnyValue) -> crate::Result<SqlValue> {
    Ok(match value {
        AnyValue::Null => SqlValue::Null,
        AnyValue::Boolean(b) => SqlValue::Integer(b as i64),
        AnyValue::Float32(f) => SqlValue::Real(f as f64),
        AnyValue::Float64(f) => SqlValue::Real(f),
        AnyValue::Int8(i) => SqlValue::Integer(i as i64),
        AnyValue::Int16(i) => SqlValue::Integer(i as i64),
        AnyValue::Int32(i) => SqlValue::Integer(i as i64),
        AnyValue::Int64(i) => SqlValue::Integer(i),
        AnyValue::UInt8(u) => SqlValue::Integer(u as i64),
        AnyValue::UInt16(u) => SqlValue::Integer(u as i64),
        AnyValue::UInt32(u) => SqlValue::Integer(u as i64),
        AnyValue::UInt64(u) => SqlValue::Integer(i64::try_from(u)?),
        AnyValue::Utf8(s) => SqlValue::Text(s.to_string()),
        AnyValue::Utf8Owned(s) => SqlValue::Text(s.to_string()),
        other => anyhow::bail!("Unsupported value for SQLite storage: {:?}", other),
    })
}

/// Build a Series from one result-set column, inferring the dtype
fn column_to_series(name: &str, values: Vec<SqlValue>) -> crate::Result<Series> {
    let has_real = values.iter().any(|v| matches!(v, SqlValue::Real(_)));
    let has_integer = values.iter().any(|v| matches!(v, SqlValue::Integer(_)));
    let has_text = values.iter().any(|v| matches!(v, SqlValue::Text(_)));
    let has_blob = values.iter().any(|v| matches!(v, SqlValue::Blob(_)));

    if has_blob {
        anyhow::bail!("Column '{}' holds BLOB values, which are not supported", name);
    }
    if has_text && (has_real || has_integer) {
        anyhow::bail!("Column '{}' mixes text and numeric values", name);
    }

    if has_text {
        let parsed: Vec<Option<String>> = values
            .into_iter()
            .map(|v| match v {
                SqlValue::Text(s) => Some(s),
                _ => None,
            })
            .collect();
        return Ok(Series::new(name, parsed));
    }

    if has_real {
        let parsed: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| match v {
                SqlValue::Real(f) => Some(f),
                SqlValue::Integer(i) => Some(i as f64),
                _ => None,
            })
            .collect();
        return Ok(Series::new(name, parsed));
    }

    if has_integer {
        let parsed: Vec<Option<i64>> = values
            .into_iter()
            .map(|v| match v {
                SqlValue::Integer(i) => Some(i),
                _ => None,
            })
            .collect();
        return Ok(Series::new(name, parsed));
    }

    // Only NULLs (or an empty result set)
    let parsed: Vec<Option<f64>> = values.into_iter().map(|_| None).collect();
    Ok(Series::new(name, parsed))
}

fn validate_identifier(identifier: &str) -> crate::Result<()> {
    if identifier.is_empty() || identifier.contains('"') {
        anyhow::bail!("Invalid SQL identifier: {:?}", identifier);
    }
    Ok(())
}
