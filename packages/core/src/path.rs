//! Structural paths with optional origin and target hints.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

/// Origin naming the switch-state database namespace.
///
/// Paths in this namespace carry the database name as their first element,
/// e.g. `sonic-db:APPL_DB/DASH_QOS`.
pub const DB_ORIGIN: &str = "sonic-db";

lazy_static! {
    static ref ORIGIN_PREFIX: Regex = Regex::new(r"^(?P<origin>[^/:\\]+):(?P<rest>.*)$").unwrap();
    static ref NUMERIC_COMPONENT: Regex = Regex::new(r"^([1-9][0-9]*|0)$").unwrap();
}

/// Errors related to path parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid path component '{component}' at position {position}: {message}")]
    InvalidComponent {
        component: String,
        position: usize,
        message: String,
    },
    #[error("invalid path string {path:?}: {message}")]
    PathStringInvalid { path: String, message: String },
}

/// A location in a JSON document or in a logical database.
///
/// `components` are map keys or, against a sequence, base-10 indices rendered
/// as strings. `origin` names the schema namespace and `target` the database a
/// protocol path addresses; both are optional and only consulted by the
/// origin/target resolver.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    pub origin: Option<String>,
    pub target: Option<String>,
    pub components: Vec<String>,
}

impl Path {
    /// Parse a `/`-separated path.
    ///
    /// Empty components are dropped, so `//` and a trailing `/` are
    /// normalized away. A component may contain a literal slash written as
    /// `\/`, and a literal backslash written as `\\`.
    ///
    /// ```rust
    /// use sonic_data_core::Path;
    ///
    /// let path = Path::parse("DASH_ROUTE_TABLE/Vnet1:10.1.0.0\\/16").unwrap();
    /// assert_eq!(path.len(), 2);
    /// assert_eq!(path[1], "Vnet1:10.1.0.0/16");
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let mut components = Vec::new();
        let mut current = String::new();
        let mut chars = s.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped @ ('/' | '\\')) => current.push(escaped),
                    Some(other) => {
                        return Err(PathError::PathStringInvalid {
                            path: s.to_string(),
                            message: format!("unsupported escape sequence '\\{}'", other),
                        })
                    }
                    None => {
                        return Err(PathError::PathStringInvalid {
                            path: s.to_string(),
                            message: "dangling escape at end of path".to_string(),
                        })
                    }
                },
                '/' => {
                    if !current.is_empty() {
                        components.push(std::mem::take(&mut current));
                    }
                }
                c => current.push(c),
            }
        }
        if !current.is_empty() {
            components.push(current);
        }

        Ok(Path {
            origin: None,
            target: None,
            components,
        })
    }

    /// Parse a protocol xpath of the form `[origin:]elem/elem/...`.
    ///
    /// When the origin is [`DB_ORIGIN`], the first element names the database
    /// and is moved into the `target` hint.
    ///
    /// Anything before a `:` that precedes the first `/` is read as the origin,
    /// so a lone element such as `Vnet1:10.0.0.1` parses as origin `Vnet1`.
    /// Keys containing a colon have to follow their table element.
    ///
    /// ```rust
    /// use sonic_data_core::Path;
    ///
    /// let path = Path::parse_xpath("sonic-db:APPL_DB/DASH_QOS").unwrap();
    /// assert_eq!(path.origin.as_deref(), Some("sonic-db"));
    /// assert_eq!(path.target.as_deref(), Some("APPL_DB"));
    /// assert_eq!(path.components, vec!["DASH_QOS".to_string()]);
    /// ```
    pub fn parse_xpath(s: &str) -> Result<Self, PathError> {
        let (origin, rest) = match ORIGIN_PREFIX.captures(s) {
            Some(captures) => (
                Some(captures["origin"].to_string()),
                captures.name("rest").map_or("", |m| m.as_str()),
            ),
            None => (None, s),
        };

        let mut path = Path::parse(rest)?;
        if origin.as_deref() == Some(DB_ORIGIN) {
            if path.components.is_empty() {
                return Err(PathError::PathStringInvalid {
                    path: s.to_string(),
                    message: format!("origin {} requires a database element", DB_ORIGIN),
                });
            }
            path.target = Some(path.components.remove(0));
        }
        path.origin = origin;
        Ok(path)
    }

    /// Create a path from already split components.
    ///
    /// Components are taken verbatim (no escape processing) but must be
    /// non-empty.
    pub fn from_components<I, S>(components: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let components: Vec<String> = components.into_iter().map(Into::into).collect();
        if let Some(position) = components.iter().position(String::is_empty) {
            return Err(PathError::InvalidComponent {
                component: String::new(),
                position,
                message: "empty component".to_string(),
            });
        }
        Ok(Path {
            origin: None,
            target: None,
            components,
        })
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Check if this path is empty (the document root).
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.components.iter()
    }

    /// Get a slice of components as a new path, keeping this path's hints.
    pub fn slice(&self, start: usize, end: usize) -> Path {
        Path {
            origin: self.origin.clone(),
            target: self.target.clone(),
            components: self.components[start..end].to_vec(),
        }
    }
}

/// Parse a component as a sequence index.
///
/// Only canonical base-10 integers qualify: `"0"`, `"7"`, `"42"`, but not
/// `"07"`, `"-1"` or `"+3"`.
pub fn parse_index(component: &str) -> Option<usize> {
    if NUMERIC_COMPONENT.is_match(component) {
        component.parse::<usize>().ok()
    } else {
        None
    }
}

/// Renders the xpath form. A target is written as the leading element only
/// under [`DB_ORIGIN`], where `parse_xpath` reads it back; otherwise it is
/// shown bracketed, as in `[APPL_DB]DASH_QOS/qos_01`.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(origin) = &self.origin {
            write!(f, "{}:", origin)?;
        }
        let inline_target = match &self.target {
            Some(target) if self.origin.as_deref() == Some(DB_ORIGIN) => Some(target),
            Some(target) => {
                write!(f, "[{}]", target)?;
                None
            }
            None => None,
        };
        let mut first = true;
        for component in inline_target.into_iter().chain(self.components.iter()) {
            if !first {
                f.write_str("/")?;
            }
            first = false;
            f.write_str(&component.replace('\\', "\\\\").replace('/', "\\/"))?;
        }
        Ok(())
    }
}

impl std::ops::Index<usize> for Path {
    type Output = String;

    fn index(&self, i: usize) -> &Self::Output {
        &self.components[i]
    }
}

/// Create a path from a string literal, panicking on a malformed path.
///
/// ```rust
/// use sonic_data_core::path;
///
/// let path = path!("DASH_QOS/qos_01");
/// assert_eq!(path.len(), 2);
/// ```
#[macro_export]
macro_rules! path {
    ($path_string:expr) => {
        $crate::Path::parse($path_string).unwrap()
    };
    ($($args:tt),*) => {
        compile_error!("Expected 1 argument, got something else")
    };
}
