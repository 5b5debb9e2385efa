//! Deduplication of proxy records by `server:port`

use crate::proxy::models::ProxyRecord;
use std::collections::HashMap;

/// Collapse records sharing a `server:port` identity.
///
/// Keys keep the position of their first occurrence, while the stored record
/// is replaced by every later occurrence, so the last one seen wins.
pub fn dedup_records<I>(records: I) -> Vec<ProxyRecord>
where
    I: IntoIterator<Item = ProxyRecord>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<ProxyRecord> = Vec::new();

    for record in records {
        let key = record.identity();
        match positions.get(&key) {
            Some(&index) => unique[index] = record,
            None => {
                positions.insert(key, unique.len());
                unique.push(record);
            }
        }
    }

    unique
}
