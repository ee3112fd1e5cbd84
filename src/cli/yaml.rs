use std::path::Path;

use anyhow::bail;
use nondestructive::yaml;

/// Load a YAML file, apply edits via a closure, and write it back. Comments
/// and formatting outside the edited values are preserved.
pub(crate) fn edit_yaml<T>(
    path: &Path,
    f: impl FnOnce(&mut yaml::Document) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)?;
    let mut doc = yaml::from_slice(&content)?;

    let out = f(&mut doc)?;

    std::fs::write(path, doc.to_string())?;
    Ok(out)
}

/// Navigate into a nested YAML mapping by key path, creating any missing
/// intermediate mappings along the way. Returns a `MappingMut` pointing at
/// the innermost mapping.
///
/// `path` must be non-empty. For example, `&["contexts", "prod"]` returns a
/// `MappingMut` for the `prod` entry.
pub(crate) fn mapping_at_path<'a>(
    doc: &'a mut yaml::Document,
    path: &[&str],
) -> anyhow::Result<yaml::MappingMut<'a>> {
    assert!(!path.is_empty());

    let Some(mut current) = doc.as_mut().into_mapping_mut() else {
        bail!("invalid file: not a dictionary");
    };

    for &key in path {
        if current.as_ref().get(key).is_none() {
            let _ = current.insert(key, yaml::Separator::Auto).make_mapping();
        }

        let Some(next) = current.get_into_mut(key).and_then(|v| v.into_mapping_mut()) else {
            bail!("key {key:?} exists, but is not a dictionary");
        };

        current = next
    }

    Ok(current)
}

pub(crate) fn upsert_str(m: &mut yaml::MappingMut<'_>, key: &str, value: &str) {
    if let Some(mut v) = m.get_mut(key) {
        v.set_string(value);
    } else {
        m.insert_str(key, value);
    }
}

pub(crate) fn upsert_i64(m: &mut yaml::MappingMut<'_>, key: &str, value: i64) {
    if let Some(mut v) = m.get_mut(key) {
        v.set_i64(value);
    } else {
        m.insert_i64(key, value);
    }
}
