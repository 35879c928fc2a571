// src/registry/merge.rs

use toml::{Table, Value};

use crate::types::MergePolicy;

/// Merge target-level options over task-level defaults.
///
/// Keys set in `overrides` always win. With [`MergePolicy::Shallow`] a
/// nested table in `overrides` replaces the default table wholesale; with
/// [`MergePolicy::Deep`] both tables are merged recursively.
pub fn merge_options(defaults: &Table, overrides: &Table, policy: MergePolicy) -> Table {
    let mut merged = defaults.clone();

    for (key, value) in overrides.iter() {
        if policy == MergePolicy::Deep {
            if let (Some(Value::Table(base)), Value::Table(over)) = (merged.get_mut(key), value) {
                let nested = merge_options(base, over, policy);
                *base = nested;
                continue;
            }
        }
        merged.insert(key.clone(), value.clone());
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(src: &str) -> Table {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn target_keys_override_and_unset_keys_inherit() {
        let defaults = table("browsers = ['last 2 versions']\nmap = false");
        let overrides = table("map = true");

        let merged = merge_options(&defaults, &overrides, MergePolicy::Shallow);
        assert_eq!(merged.get("map"), Some(&Value::Boolean(true)));
        assert!(merged.contains_key("browsers"));
    }

    #[test]
    fn shallow_merge_replaces_nested_tables() {
        let defaults = table("[compress]\ndrop_console = false\nsequences = true");
        let overrides = table("[compress]\ndrop_console = true");

        let merged = merge_options(&defaults, &overrides, MergePolicy::Shallow);
        let compress = merged["compress"].as_table().unwrap();
        assert_eq!(compress.len(), 1);
        assert_eq!(compress["drop_console"], Value::Boolean(true));
    }

    #[test]
    fn deep_merge_combines_nested_tables() {
        let defaults = table("[compress]\ndrop_console = false\nsequences = true");
        let overrides = table("[compress]\ndrop_console = true");

        let merged = merge_options(&defaults, &overrides, MergePolicy::Deep);
        let compress = merged["compress"].as_table().unwrap();
        assert_eq!(compress.len(), 2);
        assert_eq!(compress["drop_console"], Value::Boolean(true));
        assert_eq!(compress["sequences"], Value::Boolean(true));
    }
}
