//! Storage layout compatibility checks
//!
//! A proxy keeps its state in its own storage while the code lives in the
//! implementation, so an upgrade is only safe when every variable of the
//! linked implementation keeps its slot, offset and type in the new one.
//! Layouts come from the compiler's `storageLayout` output.

use serde::{Deserialize, Serialize};

/// The `storageLayout` section of a compiler artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLayout {
    pub storage: Vec<StorageItem>,
}

/// A single state variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageItem {
    pub label: String,
    pub slot: String,
    pub offset: u64,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub contract: String,
}

impl StorageItem {
    fn is_gap(&self) -> bool {
        self.label == "__gap" || self.label.ends_with("__gap")
    }

    fn slot_number(&self) -> Option<u128> {
        self.slot.parse().ok()
    }

    /// Number of slots a `uint256[N]` gap reserves
    fn gap_len(&self) -> Option<u128> {
        let rest = self.ty.strip_prefix("t_array(t_uint256)")?;
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }

    fn gap_end(&self) -> Option<u128> {
        Some(self.slot_number()? + self.gap_len()?)
    }

    fn describe(&self) -> String {
        format!("'{}' ({}) at slot {}", self.label, normalize_type(&self.ty), self.slot)
    }
}

/// Strip compiler AST ids from a type identifier.
///
/// `t_struct(Listing)1234_storage` becomes `t_struct(Listing)_storage`, so
/// identical types from separate compilations compare equal.
fn normalize_type(ty: &str) -> String {
    const NAMED: [&str; 4] = [
        "t_struct(",
        "t_enum(",
        "t_contract(",
        "t_userDefinedValueType(",
    ];

    let mut out = String::with_capacity(ty.len());
    let mut rest = ty;
    loop {
        let next = NAMED
            .iter()
            .filter_map(|prefix| rest.find(prefix).map(|pos| (pos, prefix.len())))
            .min();
        let Some((pos, len)) = next else {
            out.push_str(rest);
            return out;
        };
        let Some(close) = rest[pos + len..].find(')') else {
            out.push_str(rest);
            return out;
        };
        let name_end = pos + len + close + 1;
        out.push_str(&rest[..name_end]);
        rest = rest[name_end..].trim_start_matches(|c: char| c.is_ascii_digit());
    }
}

fn same_variable(old: &StorageItem, new: &StorageItem) -> bool {
    old.label == new.label
        && old.slot == new.slot
        && old.offset == new.offset
        && normalize_type(&old.ty) == normalize_type(&new.ty)
}

/// Check that `new` can replace `old` behind a proxy.
///
/// New variables may only be appended, or carved out of a `__gap` whose end
/// slot is unchanged.
pub fn check_compatible(old: &StorageLayout, new: &StorageLayout) -> Result<(), String> {
    let mut new_items = new.storage.iter().peekable();

    for old_item in &old.storage {
        let Some(candidate) = new_items.next() else {
            return Err(format!("{} was removed", old_item.describe()));
        };

        if same_variable(old_item, candidate) {
            continue;
        }

        if old_item.is_gap() {
            let end = old_item
                .gap_end()
                .ok_or_else(|| format!("unrecognized gap type {}", old_item.ty))?;

            // Variables inserted before a shrunk gap
            let mut current = candidate;
            loop {
                if current.is_gap() && current.gap_end() == Some(end) {
                    break;
                }
                match current.slot_number() {
                    Some(slot) if slot < end => {}
                    _ => {
                        return Err(format!(
                            "{} overflows the gap ending at slot {}",
                            current.describe(),
                            end
                        ))
                    }
                }
                current = new_items.next().ok_or_else(|| {
                    format!("gap ending at slot {} is no longer reserved", end)
                })?;
            }
            continue;
        }

        return Err(format!(
            "{} was replaced by {}",
            old_item.describe(),
            candidate.describe()
        ));
    }

    Ok(())
}
