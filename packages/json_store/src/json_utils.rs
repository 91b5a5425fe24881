use serde_json::value::Value as JsonValue;
use sonic_data_core::{parse_index, Error, Path};

fn not_found(path: &Path, position: usize) -> Error {
    log::debug!(
        "Lookup of {} failed at component {} ({}).",
        path,
        position,
        path[position]
    );
    Error::NotFound { path: path.clone() }
}

fn invalid_path(path: &Path, message: String) -> Error {
    Error::InvalidPath {
        path: path.clone(),
        message,
    }
}

/// A fresh container for a child that will be indexed by `next`: a sequence
/// when `next` is an index, a map otherwise.
fn empty_container_for(next: &str) -> JsonValue {
    if parse_index(next).is_some() {
        JsonValue::Array(Vec::new())
    } else {
        JsonValue::Object(serde_json::Map::new())
    }
}

pub fn get_path<'tree>(tree: &'tree JsonValue, path: &Path) -> Result<&'tree JsonValue, Error> {
    let mut cursor = tree;
    for (position, component) in path.iter().enumerate() {
        let next = match cursor {
            JsonValue::Object(map) => map.get(component),
            JsonValue::Array(arr) => parse_index(component).and_then(|index| arr.get(index)),
            JsonValue::Null | JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) => {
                None
            }
        };
        cursor = next.ok_or_else(|| not_found(path, position))?;
    }

    Ok(cursor)
}

pub fn get_path_mut<'tree>(
    tree: &'tree mut JsonValue,
    path: &Path,
) -> Result<&'tree mut JsonValue, Error> {
    let mut cursor = tree;
    for (position, component) in path.iter().enumerate() {
        let next = match cursor {
            JsonValue::Object(map) => map.get_mut(component),
            JsonValue::Array(arr) => {
                parse_index(component).and_then(move |index| arr.get_mut(index))
            }
            JsonValue::Null | JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) => {
                None
            }
        };
        cursor = next.ok_or_else(|| not_found(path, position))?;
    }

    Ok(cursor)
}

/// Set `value` at `path`, creating intermediate containers as needed.
///
/// Sequences only ever grow by appending at index `len`; any other index
/// beyond the end, or a non-numeric component against a sequence, is an
/// `InvalidPath`. On error `tree` may hold newly created (empty) intermediate
/// containers, so callers needing atomicity should work on a copy.
pub fn set_path(tree: &mut JsonValue, path: &Path, value: JsonValue) -> Result<(), Error> {
    let Some((last_path_component, prefix)) = path.components.split_last() else {
        *tree = value;
        return Ok(());
    };

    let mut cursor = tree;
    for (position, component) in prefix.iter().enumerate() {
        let next_component = &path[position + 1];
        cursor = child_or_insert(cursor, component, next_component, path)?;
    }

    set_child(cursor, last_path_component, value, path)
}

fn child_or_insert<'tree>(
    parent: &'tree mut JsonValue,
    component: &str,
    next_component: &str,
    path: &Path,
) -> Result<&'tree mut JsonValue, Error> {
    match parent {
        JsonValue::Object(map) => Ok(map
            .entry(component.to_owned())
            .or_insert_with(|| empty_container_for(next_component))),
        JsonValue::Array(arr) => {
            let index = sequence_index(arr.len(), component, path)?;
            if index == arr.len() {
                arr.push(empty_container_for(next_component));
            }
            Ok(&mut arr[index])
        }
        JsonValue::Null | JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) => Err(
            invalid_path(path, format!("component ({}) descends into a scalar", component)),
        ),
    }
}

fn set_child(
    parent: &mut JsonValue,
    component: &str,
    value: JsonValue,
    path: &Path,
) -> Result<(), Error> {
    match parent {
        JsonValue::Object(map) => {
            map.insert(component.to_owned(), value);
        }
        JsonValue::Array(arr) => {
            let index = sequence_index(arr.len(), component, path)?;
            if index == arr.len() {
                arr.push(value);
            } else {
                arr[index] = value;
            }
        }
        JsonValue::Null | JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) => {
            return Err(invalid_path(
                path,
                format!("final component ({}) addresses a child of a scalar", component),
            ));
        }
    }

    Ok(())
}

/// Index of `component` within a sequence of length `len`, allowing `len`
/// itself (the append position).
fn sequence_index(len: usize, component: &str, path: &Path) -> Result<usize, Error> {
    let index = parse_index(component).ok_or_else(|| {
        invalid_path(
            path,
            format!(
                "component ({}) failed to parse as a sequence index",
                component
            ),
        )
    })?;

    if index > len {
        return Err(invalid_path(
            path,
            format!(
                "index {} is beyond the append position of a sequence of length {}",
                index, len
            ),
        ));
    }

    Ok(index)
}

/// Remove and return the value at `path`.
///
/// Removing a sequence element shifts later elements down so indices stay
/// contiguous.
pub fn remove_path(tree: &mut JsonValue, path: &Path) -> Result<JsonValue, Error> {
    let path_len = path.len();
    let Some(last_path_component) = path.components.last() else {
        return Err(invalid_path(
            path,
            "the document root cannot be removed".to_string(),
        ));
    };

    let parent = get_path_mut(tree, &path.slice(0, path_len - 1))
        .map_err(|_| Error::NotFound { path: path.clone() })?;
    let removed = match parent {
        JsonValue::Object(map) => map.remove(last_path_component),
        JsonValue::Array(arr) => match parse_index(last_path_component) {
            Some(index) if index < arr.len() => Some(arr.remove(index)),
            _ => None,
        },
        JsonValue::Null | JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) => None,
    };

    removed.ok_or_else(|| not_found(path, path_len - 1))
}

#[cfg(test)]
mod get_path_tests {
    use super::*;
    use serde_json::json;
    use sonic_data_core::path;

    #[test]
    fn empty() {
        assert_eq!(get_path(&json!({}), &path!("")).unwrap(), &json!({}));
    }

    #[test]
    fn look_up_atom_path() {
        let tree = json!({
            "one": 1,
            "nest_1": {
                "three": 3,
                "nest_2": {
                    "four": 4,
                    "five": 5,
                }
            }
        });
        assert_eq!(
            get_path(&tree, &path!("nest_1/nest_2/four")).unwrap(),
            &json!(4)
        );
    }

    #[test]
    fn look_up_sequence_element() {
        let tree = json!({"address_spaces": ["10.250.0.0", "192.168.3.0"]});
        assert_eq!(
            get_path(&tree, &path!("address_spaces/1")).unwrap(),
            &json!("192.168.3.0")
        );
    }

    #[test]
    fn missing_prefixes_are_not_found() {
        let tree = json!({"a": {"b": [1, 2]}, "s": "scalar"});
        for missing in ["x", "a/x", "a/b/2", "a/b/abc", "a/b/01", "s/child"] {
            assert!(
                matches!(
                    get_path(&tree, &Path::parse(missing).unwrap()),
                    Err(Error::NotFound { .. })
                ),
                "{} should not be found",
                missing
            );
        }
    }
}


#[cfg(test)]
mod remove_path_tests {
    use super::*;
    use serde_json::json;
    use sonic_data_core::path;

    #[test]
    fn removes_map_key() {
        let mut tree = json!({"DASH_QOS": {"qos_01": 1, "qos_02": 2}});
        assert_eq!(
            remove_path(&mut tree, &path!("DASH_QOS/qos_01")).unwrap(),
            json!(1)
        );
        assert_eq!(tree, json!({"DASH_QOS": {"qos_02": 2}}));
    }

    #[test]
    fn removing_sequence_element_shifts_later_elements() {
        let mut tree = json!({"list": ["a", "b", "c"]});
        assert_eq!(remove_path(&mut tree, &path!("list/0")).unwrap(), json!("a"));
        assert_eq!(tree, json!({"list": ["b", "c"]}));
        // Index 2 is once again the append position.
        set_path(&mut tree, &path!("list/2"), json!("d")).unwrap();
        assert_eq!(tree, json!({"list": ["b", "c", "d"]}));
    }

    #[test]
    fn missing_targets_are_not_found() {
        let mut tree = json!({"DASH_QOS": {"qos_01": 1}, "list": ["a"]});
        for missing in [
            "DASH_QOS/qos_02",
            "DASH_QOS/qos_03/bw",
            "list/abc",
            "list/100",
            "list/1",
        ] {
            assert!(
                matches!(
                    remove_path(&mut tree, &Path::parse(missing).unwrap()),
                    Err(Error::NotFound { .. })
                ),
                "{} should not be found",
                missing
            );
        }
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut tree = json!({});
        assert!(matches!(
            remove_path(&mut tree, &path!("")),
            Err(Error::InvalidPath { .. })
        ));
    }
}
