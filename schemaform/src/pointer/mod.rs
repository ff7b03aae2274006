//! JSON Pointer algebra.
//!
//! Pointers come in two shapes: the compiled string form (`/a/b/0`) and the
//! parsed key list (`["a", "b", "0"]`). Every operation in this module
//! accepts either through [`ToPointer`]. The key `-` addresses "the end of an
//! array" when writing and "any index" in generic pointers.
//!
//! ## Submodules
//!
//! - [`access`] - safe traversal and mutation of `serde_json::Value` trees
//! - [`walk`] - deep pre/post-order walks carrying the pointer of each node
//! - [`translate`] - generic/indexed and data/schema pointer-space translation

use std::{fmt, str::FromStr};

use percent_encoding::percent_decode_str;
use serde_json::Value;

use crate::error::{CompileError, Result};

/// Safe traversal and mutation.
pub mod access;

/// Pointer-space translation.
pub mod translate;

/// Deep tree walks.
pub mod walk;

pub use access::{get, get_first, get_slice, has, insert, remove, set, try_get};
pub use translate::{
    to_control_pointer, to_data_pointer, to_generic_pointer, to_indexed_pointer,
    to_schema_pointer,
};
pub use walk::{WalkOrder, for_each_deep, for_each_deep_copy};

/// A parsed JSON Pointer: an ordered list of unescaped keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pointer {
    keys: Vec<String>,
}

impl Pointer {
    /// The empty pointer, addressing the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a compiled pointer string.
    ///
    /// A leading `#` (URI fragment form) is stripped and the remainder is
    /// percent-decoded. `""` and `"#"` both denote the root.
    pub fn parse(pointer: &str) -> Result<Self> {
        let body = match pointer.strip_prefix('#') {
            Some(fragment) => percent_decode_str(fragment)
                .decode_utf8()
                .map_err(|e| CompileError::syntax(pointer, e.to_string()))?
                .into_owned(),
            None => pointer.to_string(),
        };
        if body.is_empty() {
            return Ok(Self::root());
        }
        if !body.starts_with('/') {
            return Err(CompileError::syntax(pointer, "must start with '/'"));
        }
        Ok(Self {
            keys: body[1..].split('/').map(unescape).collect(),
        })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn into_keys(self) -> Vec<String> {
        self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn push(&mut self, key: impl Into<String>) {
        self.keys.push(key.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.keys.pop()
    }

    /// Last key, if any.
    pub fn last(&self) -> Option<&str> {
        self.keys.last().map(String::as_str)
    }

    /// Pointer to the containing node. The root has no parent.
    pub fn parent(&self) -> Option<Pointer> {
        let (_, head) = self.keys.split_last()?;
        Some(Pointer {
            keys: head.to_vec(),
        })
    }

    /// Compile into the string form.
    pub fn compile(&self) -> String {
        compile_keys(&self.keys)
    }

    /// Compile, writing `default` in place of every empty key.
    pub fn compile_with_default(&self, default: &str) -> String {
        let mut out = String::new();
        for key in &self.keys {
            out.push('/');
            if key.is_empty() {
                out.push_str(&escape(default));
            } else {
                out.push_str(&escape(key));
            }
        }
        out
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compile())
    }
}

impl FromStr for Pointer {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self> {
        Pointer::parse(s)
    }
}

impl From<Vec<String>> for Pointer {
    fn from(keys: Vec<String>) -> Self {
        Pointer { keys }
    }
}

impl<'a> FromIterator<&'a str> for Pointer {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Pointer {
            keys: iter.into_iter().map(str::to_string).collect(),
        }
    }
}

/// Anything that can be read as a pointer: compiled strings, key lists,
/// parsed pointers, or a JSON string / array of strings.
pub trait ToPointer {
    fn to_pointer(&self) -> Result<Pointer>;
}

impl ToPointer for Pointer {
    fn to_pointer(&self) -> Result<Pointer> {
        Ok(self.clone())
    }
}

impl ToPointer for str {
    fn to_pointer(&self) -> Result<Pointer> {
        Pointer::parse(self)
    }
}

impl ToPointer for String {
    fn to_pointer(&self) -> Result<Pointer> {
        Pointer::parse(self)
    }
}

impl ToPointer for [String] {
    fn to_pointer(&self) -> Result<Pointer> {
        Ok(Pointer {
            keys: self.to_vec(),
        })
    }
}

impl ToPointer for Vec<String> {
    fn to_pointer(&self) -> Result<Pointer> {
        self.as_slice().to_pointer()
    }
}

impl ToPointer for [&str] {
    fn to_pointer(&self) -> Result<Pointer> {
        Ok(self.iter().copied().collect())
    }
}

impl<const N: usize> ToPointer for [&str; N] {
    fn to_pointer(&self) -> Result<Pointer> {
        Ok(self.iter().copied().collect())
    }
}

impl ToPointer for Value {
    fn to_pointer(&self) -> Result<Pointer> {
        match self {
            Value::String(s) => Pointer::parse(s),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(CompileError::syntax(
                        self,
                        format!("pointer array contains non-string entry {other}"),
                    )),
                })
                .collect::<Result<Vec<_>>>()
                .map(Pointer::from),
            other => Err(CompileError::syntax(
                other,
                "expected a string or an array of strings",
            )),
        }
    }
}

impl<T: ToPointer + ?Sized> ToPointer for &T {
    fn to_pointer(&self) -> Result<Pointer> {
        (**self).to_pointer()
    }
}

/// Escape one key: `~` becomes `~0`, `/` becomes `~1`.
pub fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Reverse of [`escape`].
pub fn unescape(key: &str) -> String {
    key.replace("~1", "/").replace("~0", "~")
}

/// Parse any pointer-like input into its key list.
pub fn parse(pointer: impl ToPointer) -> Result<Vec<String>> {
    pointer.to_pointer().map(Pointer::into_keys)
}

/// Compile any pointer-like input into its string form.
pub fn compile(pointer: impl ToPointer) -> Result<String> {
    pointer.to_pointer().map(|p| p.compile())
}

pub(crate) fn compile_keys<S: AsRef<str>>(keys: &[S]) -> String {
    let mut out = String::new();
    for key in keys {
        out.push('/');
        out.push_str(&escape(key.as_ref()));
    }
    out
}

/// Join a compiled pointer and one more unescaped key.
pub fn join(pointer: &str, key: &str) -> String {
    format!("{pointer}/{}", escape(key))
}

/// Whether `value` looks like a compiled pointer string.
pub fn is_json_pointer(value: &str) -> bool {
    value.is_empty() || value == "#" || value.starts_with('/') || value.starts_with("#/")
}

/// Last key of a pointer, `None` for the root or an unparsable pointer.
pub fn to_key(pointer: impl ToPointer) -> Option<String> {
    pointer.to_pointer().ok()?.pop()
}

/// Whether `short` addresses an ancestor of `long`.
///
/// Comparison is key-wise, so `/a` is not an ancestor of `/ab`. When
/// `allow_equal` is set, a pointer also counts as a sub-pointer of itself.
pub fn is_sub_pointer(short: &str, long: &str, allow_equal: bool) -> bool {
    if short == long {
        return allow_equal;
    }
    match long.strip_prefix(short) {
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

/// Split a dot / bracket object path (`a.b[0]['c.d']`) into keys.
///
/// Strings that already look like JSON Pointers are parsed as pointers.
pub fn parse_object_path(path: &str) -> Vec<String> {
    if is_json_pointer(path) {
        return Pointer::parse(path)
            .map(Pointer::into_keys)
            .unwrap_or_default();
    }
    let chars: Vec<char> = path.chars().collect();
    let find = |from: usize, needle: char| {
        chars[from..]
            .iter()
            .position(|c| *c == needle)
            .map(|i| i + from)
    };
    let mut parts = Vec::new();
    let mut index = 0;
    while index < chars.len() {
        let next_dot = find(index, '.');
        let Some(open) = find(index, '[').filter(|o| next_dot.is_none_or(|d| *o < d)) else {
            match next_dot {
                Some(dot) => {
                    parts.push(chars[index..dot].iter().collect());
                    index = dot + 1;
                }
                None => {
                    parts.push(chars[index..].iter().collect());
                    index = chars.len();
                }
            }
            continue;
        };
        if open > index {
            parts.push(chars[index..open].iter().collect());
        }
        match chars.get(open + 1).copied() {
            Some(q @ ('"' | '\'')) => {
                let mut close = open + 2;
                while close < chars.len()
                    && !(chars[close] == q
                        && chars.get(close + 1) == Some(&']')
                        && chars[close - 1] != '\\')
                {
                    close += 1;
                }
                let raw: String = chars[open + 2..close.min(chars.len())].iter().collect();
                parts.push(raw.replace(&format!("\\{q}"), &q.to_string()));
                index = close + 2;
            }
            _ => {
                let close = find(open, ']').unwrap_or(chars.len());
                parts.push(chars[open + 1..close].iter().collect());
                index = close + 1;
            }
        }
        if chars.get(index) == Some(&'.') {
            index += 1;
        }
    }
    parts
}

/// Parse a key as an array index. Only plain decimal digits are accepted.
pub(crate) fn parse_index(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_and_compile() {
        let p = Pointer::parse("/a/b~1c/d~0e/0").unwrap();
        assert_eq!(p.keys(), ["a", "b/c", "d~e", "0"]);
        assert_eq!(p.compile(), "/a/b~1c/d~0e/0");
    }

    #[test]
    fn test_parse_fragment_form() {
        assert_eq!(parse("#/definitions/node").unwrap(), ["definitions", "node"]);
        assert_eq!(parse("#/a%20b").unwrap(), ["a b"]);
        assert!(parse("#").unwrap().is_empty());
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_relative() {
        let err = Pointer::parse("a/b").unwrap_err();
        assert_eq!(err.kind(), "pointer-syntax");
    }

    #[test]
    fn test_value_arrays_must_hold_strings() {
        assert_eq!(json!(["a", "b"]).to_pointer().unwrap().compile(), "/a/b");
        assert!(json!(["a", 1]).to_pointer().is_err());
        assert!(json!(3).to_pointer().is_err());
    }

    #[test]
    fn test_compile_with_default() {
        let p: Pointer = ["items", "", "name"].iter().copied().collect();
        assert_eq!(p.compile_with_default("-"), "/items/-/name");
    }

    #[test]
    fn test_is_sub_pointer() {
        assert!(is_sub_pointer("/a", "/a/b", false));
        assert!(!is_sub_pointer("/a", "/ab", false));
        assert!(is_sub_pointer("", "/a", false));
        assert!(is_sub_pointer("/a", "/a", true));
        assert!(!is_sub_pointer("/a", "/a", false));
        assert!(!is_sub_pointer("/a/b", "/a", true));
    }

    #[test]
    fn test_parse_object_path() {
        assert_eq!(parse_object_path("a.b.c"), ["a", "b", "c"]);
        assert_eq!(parse_object_path("a[0].b"), ["a", "0", "b"]);
        assert_eq!(parse_object_path("a['c.d'].e"), ["a", "c.d", "e"]);
        assert_eq!(parse_object_path("list[].name"), ["list", "", "name"]);
        assert_eq!(parse_object_path("/x/y"), ["x", "y"]);
    }

    #[test]
    fn test_to_key() {
        assert_eq!(to_key("/a/b").as_deref(), Some("b"));
        assert_eq!(to_key(""), None);
    }
}
