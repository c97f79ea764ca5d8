//! JSON encoding of row `data` columns.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreResult;

pub fn encode<T: Serialize>(value: &T) -> StoreResult<String> {
    Ok(serde_json::to_string(value)?)
}

pub fn decode<T: DeserializeOwned>(data: &str) -> StoreResult<T> {
    Ok(serde_json::from_str(data)?)
}
