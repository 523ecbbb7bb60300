//! Record id generation.
//!
//! Ids look like `std_lx3k9q2a_k3j9x0pq`: table prefix, millisecond timestamp
//! in base 36, random suffix. Uniqueness is probabilistic.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::models::TableName;

/// Length of the random id suffix.
/// 8 base-36 characters keeps collisions within one millisecond negligible.
const SUFFIX_LEN: usize = 8;

pub fn generate_id(table: TableName) -> String {
    format!("{}_{}_{}", table.id_prefix(), timestamp(), suffix())
}

/// Id for the `index`-th record of a bulk import.
pub fn generate_bulk_id(table: TableName, index: usize) -> String {
    format!(
        "{}_{}_{}_{}",
        table.id_prefix(),
        timestamp(),
        to_base36(index as u64),
        suffix()
    )
}

fn timestamp() -> String {
    to_base36(Utc::now().timestamp_millis().max(0) as u64)
}

fn suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_id_shape() {
        let id = generate_id(TableName::Students);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "std");
        assert_eq!(parts[2].len(), SUFFIX_LEN);
    }

    #[test]
    fn test_bulk_ids_carry_index() {
        let id = generate_bulk_id(TableName::Materials, 37);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts[0], "mat");
        assert_eq!(parts[2], "11");
    }

    #[test]
    fn test_ids_do_not_collide() {
        let ids: HashSet<String> = (0..5000).map(|_| generate_id(TableName::Users)).collect();
        assert_eq!(ids.len(), 5000);
    }
}
