use crate::error::CliError;
use serde::Serialize;

/// Writes `value` as pretty JSON to `path`, or to stdout when no path is given.
pub async fn write_json<T: Serialize>(value: &T, path: Option<String>) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(CliError::JsonSerialize)?;
    match path {
        Some(path) => tokio::fs::write(path, json).await?,
        None => println!("{json}"),
    }
    Ok(())
}
