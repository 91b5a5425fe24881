//! Origin/target resolution over a request's paths.
//!
//! A request may carry several paths (a batched Set, for example). All of them
//! must address the same namespace and database. An explicit override from the
//! caller is a consistency check, never a silent force.

use crate::error::{Attribute, Error, Result};
use crate::path::Path;

/// Resolve the schema namespace addressed by `paths`.
pub fn resolve_origin<'a, I>(origin: &str, paths: I) -> Result<String>
where
    I: IntoIterator<Item = &'a Path>,
{
    resolve(Attribute::Origin, origin, paths)
}

/// Resolve the database addressed by `paths`.
pub fn resolve_target<'a, I>(target: &str, paths: I) -> Result<String>
where
    I: IntoIterator<Item = &'a Path>,
{
    resolve(Attribute::Target, target, paths)
}

fn hint(attribute: Attribute, path: &Path) -> Option<&str> {
    match attribute {
        Attribute::Origin => path.origin.as_deref(),
        Attribute::Target => path.target.as_deref(),
    }
}

/// With no paths, or paths that carry no hint, `preferred` is returned as is
/// (even when empty).
fn resolve<'a, I>(attribute: Attribute, preferred: &str, paths: I) -> Result<String>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut derived: Option<&str> = None;
    for path in paths {
        let Some(found) = hint(attribute, path).filter(|v| !v.is_empty()) else {
            continue;
        };
        match derived {
            None => derived = Some(found),
            Some(expected) if expected != found => {
                return Err(Error::Conflict {
                    attribute,
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
            Some(_) => {}
        }
    }

    match derived {
        Some(found) if !preferred.is_empty() && preferred != found => Err(Error::Conflict {
            attribute,
            expected: preferred.to_string(),
            found: found.to_string(),
        }),
        Some(found) => Ok(found.to_string()),
        None => Ok(preferred.to_string()),
    }
}
