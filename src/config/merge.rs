//! Layer merging for the flat working map.
//!
//! Higher layers replace values of lower layers key by key; keys that a
//! higher layer does not mention keep their lower-layer value. rc files
//! are read straight into the working map so that `$NAME` in a later file
//! sees the values of earlier ones.

use super::types::RcOption;
use crate::env::Environment;
use std::collections::HashMap;

/// Seed a working map from the options' compiled-in defaults.
pub fn seed_defaults(options: &[RcOption]) -> HashMap<String, String> {
    options
        .iter()
        .map(|o| (o.key.clone(), o.default.clone()))
        .collect()
}

/// Replace every value whose key is also set in the environment.
///
/// Only keys already present are consulted; the environment never adds
/// keys of its own.
pub fn overlay_env(map: &mut HashMap<String, String>, env: &impl Environment) -> usize {
    let mut replaced = 0;
    for (key, value) in map.iter_mut() {
        if let Some(env_value) = env.lookup(key) {
            *value = env_value;
            replaced += 1;
        }
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnv;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_seed_uses_defaults_not_values() {
        let mut option = RcOption::string("A", "default", "");
        option.value = "layered".to_string();
        let seeded = seed_defaults(&[option, RcOption::integer("B", "3", "")]);
        assert_eq!(seeded, map(&[("A", "default"), ("B", "3")]));
    }

    #[test]
    fn test_env_only_touches_known_keys() {
        let mut base = map(&[("A", "file"), ("B", "file")]);
        let env = MapEnv::new().with("A", "env").with("C", "env");
        let replaced = overlay_env(&mut base, &env);
        assert_eq!(replaced, 1);
        assert_eq!(base, map(&[("A", "env"), ("B", "file")]));
    }

    #[test]
    fn test_env_empty_value_still_wins() {
        let mut base = map(&[("A", "file")]);
        overlay_env(&mut base, &MapEnv::new().with("A", ""));
        assert_eq!(base["A"], "");
    }
}
