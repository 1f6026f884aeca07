use docqa_core::models::history::HistoryTable;

use crate::backend::HistoryBackend;
use crate::error::HistoryError;

/// Load the history table stored under `namespace`.
///
/// Returns `Ok(None)` when nothing is stored. A blob that fails to parse is
/// a [`HistoryError::Serialization`]; callers decide whether that means
/// "no history".
pub fn load_table<B: HistoryBackend + ?Sized>(
    backend: &B,
    namespace: &str,
) -> Result<Option<HistoryTable>, HistoryError> {
    let Some(bytes) = backend.get(namespace)? else {
        return Ok(None);
    };
    let table: HistoryTable = serde_json::from_slice(&bytes)?;
    Ok(Some(table))
}

/// Serialize and store the whole table under `namespace`, replacing
/// whatever was there.
pub fn save_table<B: HistoryBackend + ?Sized>(
    backend: &mut B,
    namespace: &str,
    table: &HistoryTable,
) -> Result<usize, HistoryError> {
    let body = serde_json::to_vec(table)?;
    let len = body.len();
    backend.set(namespace, body)?;
    Ok(len)
}
