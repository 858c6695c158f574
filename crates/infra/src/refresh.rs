//! Change detection for the polled order board.
//!
//! Every poll fetches the whole open-order collection. Re-rendering is skipped
//! when the canonical serialization of that collection hashes to the same
//! digest as last time.

use serde::Serialize;
use sha2::{Digest as _, Sha256};

/// SHA-256 of a canonical (key-sorted) JSON rendering, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    /// Digest any serializable snapshot.
    ///
    /// The value goes through `serde_json::Value` first, whose object maps are
    /// ordered by key, so field and map ordering in the input does not matter.
    pub fn of<T>(snapshot: &T) -> Result<Self, serde_json::Error>
    where
        T: Serialize + ?Sized,
    {
        let canonical = serde_json::to_string(&serde_json::to_value(snapshot)?)?;
        Ok(Self(hex::encode(Sha256::digest(canonical.as_bytes()))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Digest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compare a fresh snapshot against the digest of the last rendered one.
///
/// Returns whether anything observable changed, plus the digest to remember.
/// No previous digest always counts as changed.
pub fn changed<T>(previous: Option<&Digest>, snapshot: &T) -> Result<(bool, Digest), serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let current = Digest::of(snapshot)?;
    let changed = previous != Some(&current);
    Ok((changed, current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};

    #[test]
    fn digest_is_hex_sha256() {
        let digest = Digest::of(&json!({})).unwrap();
        // sha256("{}")
        assert_eq!(
            digest.as_str(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn unchanged_snapshot_reports_no_change_and_same_digest() {
        let orders = json!({"1": {"金額": 60, "狀態": "未完成"}});
        let (first, digest) = changed(None, &orders).unwrap();
        assert!(first);

        let (again, same) = changed(Some(&digest), &orders).unwrap();
        assert!(!again);
        assert_eq!(same, digest);
    }

    #[test]
    fn any_field_change_is_detected() {
        let before = json!({"1": {"金額": 60, "品項內容": "原味雞蛋糕 x1"}});
        let after = json!({"1": {"金額": 60, "品項內容": ""}});
        let (_, digest) = changed(None, &before).unwrap();
        let (changed_now, next) = changed(Some(&digest), &after).unwrap();
        assert!(changed_now);
        assert_ne!(next, digest);
    }

    #[test]
    fn map_iteration_order_does_not_matter() {
        let mut hashed: HashMap<&str, i64> = HashMap::new();
        let mut sorted: BTreeMap<&str, i64> = BTreeMap::new();
        for (k, v) in [("b", 2), ("a", 1), ("c", 3)] {
            hashed.insert(k, v);
            sorted.insert(k, v);
        }
        assert_eq!(Digest::of(&hashed).unwrap(), Digest::of(&sorted).unwrap());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn digest_ignores_insertion_order(
                amounts in prop::collection::vec(0i64..10_000, 1..20),
            ) {
                let forward: serde_json::Map<String, serde_json::Value> = amounts
                    .iter()
                    .enumerate()
                    .map(|(i, a)| (format!("{i:08}"), json!({"金額": a})))
                    .collect();
                let backward: serde_json::Map<String, serde_json::Value> = amounts
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(i, a)| (format!("{i:08}"), json!({"金額": a})))
                    .collect();
                prop_assert_eq!(Digest::of(&forward).unwrap(), Digest::of(&backward).unwrap());
            }

            #[test]
            fn changing_one_amount_changes_the_digest(
                amounts in prop::collection::vec(0i64..10_000, 1..20),
                pick in any::<prop::sample::Index>(),
            ) {
                let before = json!(amounts);
                let mut bumped = amounts.clone();
                bumped[pick.index(amounts.len())] += 1;
                let (_, digest) = changed(None, &before).unwrap();
                let (changed_now, _) = changed(Some(&digest), &json!(bumped)).unwrap();
                prop_assert!(changed_now);
            }
        }
    }
}
