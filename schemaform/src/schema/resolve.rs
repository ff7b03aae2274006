use std::collections::BTreeSet;

use serde_json::{Value, json};

use super::{combine_all_of, fix_required_array_properties, merge_schemas, resolved_type};
use crate::{
    context::{ArrayMap, RecursiveRefMap, SchemaRefLibrary},
    error::{CompileError, Diagnostics, Result},
    pointer::{
        self, WalkOrder, for_each_deep, for_each_deep_copy, is_sub_pointer,
        translate::generic_or_same,
    },
};

/// Output of [`resolve_schema_references`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedSchema {
    /// The schema with non-recursive `$ref`s inlined and `definitions` /
    /// `$defs` removed.
    pub compiled: Value,
    /// Canonical pointer → resolved subschema, for every recursive target.
    pub schema_ref_library: SchemaRefLibrary,
    /// Recursive `$ref` site → canonical schema pointer.
    pub schema_recursive_ref_map: RecursiveRefMap,
    /// Same map translated to generic data pointers.
    pub data_recursive_ref_map: RecursiveRefMap,
    /// Generic data pointer of every array → its tuple item count.
    pub array_map: ArrayMap,
}

#[derive(Debug, Clone)]
struct RefEdge {
    from: String,
    to: String,
    /// Targets already passed through to reach `to`.
    via: BTreeSet<String>,
}

/// Resolve every `$ref` of `schema`.
///
/// Non-recursive references are replaced by (merged copies of) their
/// targets. References that lead back to one of their own ancestors are
/// rewritten to `{"$ref": "#<canonical>"}` and recorded in the recursive
/// maps. Unresolvable references are reported and left in place.
pub fn resolve_schema_references(
    schema: &Value,
    diagnostics: &mut Diagnostics,
) -> Result<ResolvedSchema> {
    if !schema.is_object() {
        return Err(CompileError::malformed(
            "resolve_schema_references",
            "schema must be an object",
        ));
    }

    let edges = collect_ref_edges(schema, diagnostics);
    let mut ref_library = SchemaRefLibrary::new();
    for (_, target) in &edges {
        if ref_library.contains_key(target) {
            continue;
        }
        match pointer::try_get(schema, target) {
            Ok(sub) => {
                ref_library.insert(target.clone(), sub.clone());
            }
            Err(e) => diagnostics.report("resolve_schema_references", &e),
        }
    }
    let edges: Vec<(String, String)> = edges
        .into_iter()
        .filter(|(_, to)| ref_library.contains_key(to))
        .collect();

    let recursive = recursive_ref_map(&edges);
    debug!(
        "resolve: {} $ref edges, {} recursive",
        edges.len(),
        recursive.len()
    );

    let mut base = schema.clone();
    if let Some(object) = base.as_object_mut() {
        object.shift_remove("definitions");
        object.shift_remove("$defs");
    }
    let mut compiled = get_sub_schema(&base, "", Some(&ref_library), Some(&recursive), &[])
        .unwrap_or(base);

    let mut sites: Vec<(String, String)> = Vec::new();
    let mut arrays: Vec<(String, usize)> = Vec::new();
    for_each_deep(&compiled, WalkOrder::TopDown, &mut |node, at| {
        if let Some(target) = node.get("$ref").and_then(Value::as_str) {
            sites.push((at.to_string(), target.to_string()));
        }
        if resolved_type(node) == Some("array")
            && (node.get("items").is_some() || node.get("additionalItems").is_some())
        {
            let tuple_items = node.get("items").and_then(Value::as_array).map_or(0, Vec::len);
            arrays.push((at.to_string(), tuple_items));
        }
    });

    let mut canonical_sites: Vec<(String, String)> = Vec::new();
    for (site, raw) in sites {
        let target = match pointer::compile(raw.as_str()) {
            Ok(target) => target,
            Err(e) => {
                diagnostics.report("resolve_schema_references", &e);
                continue;
            }
        };
        let canonical = if is_sub_pointer(&target, &site, true) {
            target
        } else {
            let canonical = remove_recursive_references(&site, &recursive, &ArrayMap::new());
            if canonical == site {
                diagnostics.report(
                    "resolve_schema_references",
                    &CompileError::miss(format!("{raw} (referenced from {site})")),
                );
                continue;
            }
            trace!("resolve: {site} -> #{canonical}");
            pointer::set(&mut compiled, &site, json!({ "$ref": format!("#{canonical}") }))?;
            canonical
        };
        canonical_sites.push((site, canonical));
    }

    let mut resolved = ResolvedSchema::default();
    for (site, canonical) in canonical_sites {
        if !resolved.schema_ref_library.contains_key(&canonical) {
            let sub = if canonical.is_empty() {
                Some(compiled.clone())
            } else {
                get_sub_schema(
                    &compiled,
                    &canonical,
                    Some(&resolved.schema_ref_library),
                    Some(&recursive),
                    &[],
                )
            };
            match sub {
                Some(sub) => {
                    resolved.schema_ref_library.insert(canonical.clone(), sub);
                }
                None => diagnostics.report("resolve_schema_references", &CompileError::miss(&canonical)),
            }
        }
        let data_site = pointer::to_data_pointer(&site, &compiled);
        let data_target = pointer::to_data_pointer(&canonical, &compiled);
        match (data_site, data_target) {
            (Ok(from), Ok(to)) => {
                resolved.data_recursive_ref_map.entry(from).or_insert(to);
            }
            _ => debug!("resolve: {site} has no data location"),
        }
        resolved.schema_recursive_ref_map.entry(site).or_insert(canonical);
    }

    for (at, tuple_items) in arrays {
        if let Ok(data_pointer) = pointer::to_data_pointer(&at, &compiled) {
            resolved.array_map.entry(data_pointer).or_insert(tuple_items);
        }
    }

    resolved.compiled = compiled;
    Ok(resolved)
}

/// Every `$ref` of `schema` as a `(site, target)` pair, in document order.
fn collect_ref_edges(schema: &Value, diagnostics: &mut Diagnostics) -> Vec<(String, String)> {
    let mut edges = Vec::new();
    for_each_deep(schema, WalkOrder::TopDown, &mut |node, at| {
        let Some(raw) = node.get("$ref").and_then(Value::as_str) else {
            return;
        };
        match pointer::compile(raw) {
            Ok(target) if target == at => diagnostics.report(
                "resolve_schema_references",
                &CompileError::malformed(
                    "resolve_schema_references",
                    format!("schema at {at} references itself"),
                ),
            ),
            Ok(target) => edges.push((at.to_string(), target)),
            Err(e) => diagnostics.report("resolve_schema_references", &e),
        }
    });
    edges
}

/// Transitive closure of the `$ref` graph.
///
/// An edge `from → to` extends through every edge starting at or below
/// `to`, producing `from + rest → target`. Each derived edge remembers the
/// targets it passed through and never revisits one, so cycles close after
/// one lap and the closure is finite.
fn ref_closure(edges: &[(String, String)]) -> Vec<(String, String)> {
    let mut closure: Vec<RefEdge> = edges
        .iter()
        .map(|(from, to)| RefEdge {
            from: from.clone(),
            to: to.clone(),
            via: BTreeSet::from([to.clone()]),
        })
        .collect();
    let mut seen: BTreeSet<(String, String)> = edges.iter().cloned().collect();
    let mut frontier: Vec<usize> = (0..closure.len()).collect();

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for index in frontier {
            let edge = closure[index].clone();
            if is_sub_pointer(&edge.to, &edge.from, false) {
                continue;
            }
            for (from2, to2) in edges {
                if !is_sub_pointer(&edge.to, from2, true)
                    || is_sub_pointer(to2, &edge.to, true)
                    || edge.via.contains(to2)
                {
                    continue;
                }
                let from = format!("{}{}", edge.from, &from2[edge.to.len()..]);
                if seen.insert((from.clone(), to2.clone())) {
                    let mut via = edge.via.clone();
                    via.insert(to2.clone());
                    next.push(closure.len());
                    closure.push(RefEdge {
                        from,
                        to: to2.clone(),
                        via,
                    });
                }
            }
        }
        frontier = next;
    }
    closure.into_iter().map(|e| (e.from, e.to)).collect()
}

/// Recursive reference map of a `$ref` graph.
///
/// Recursive edges are closure edges whose target is a strict ancestor of
/// their site. Plain edges that inline a recursive region are composed with
/// them, so the map also covers sites as they appear after inlining. Targets
/// are then flattened until no target starts with another map key.
fn recursive_ref_map(edges: &[(String, String)]) -> RecursiveRefMap {
    let closure = ref_closure(edges);
    let mut map: RecursiveRefMap = closure
        .iter()
        .filter(|(from, to)| is_sub_pointer(to, from, false))
        .cloned()
        .collect();

    let recursive: Vec<(String, String)> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    for (from1, to1) in closure.iter().filter(|(from, to)| !is_sub_pointer(to, from, false)) {
        if recursive.iter().any(|(from, _)| is_sub_pointer(from, from1, true)) {
            continue;
        }
        for (from2, to2) in &recursive {
            if !is_sub_pointer(to1, from2, true)
                || !is_sub_pointer(to1, to2, true)
                || is_sub_pointer(to1, from1, true)
            {
                continue;
            }
            let key = format!("{from1}{}", &from2[to1.len()..]);
            if !map.contains_key(&key) {
                map.insert(key, format!("{from1}{}", &to2[to1.len()..]));
            }
        }
    }

    let empty = ArrayMap::new();
    let flattened: Vec<(String, String)> = map
        .iter()
        .map(|(from, to)| (from.clone(), remove_recursive_references(to, &map, &empty)))
        .collect();
    flattened.into_iter().collect()
}

/// Copy of the subschema at `pointer` with its references resolved.
///
/// Without a library and map this is a plain copy. Otherwise the subschema
/// is taken from the library (by its canonical pointer) or from `schema`,
/// and rewritten bottom-up: a `$ref` is replaced by its resolved target
/// (merged with any sibling keywords) unless the target is an ancestor of a
/// pointer already being resolved, `allOf` is flattened, and `required` on
/// arrays is moved to the item schema. Returns `None` when nothing lives at
/// `pointer`.
pub fn get_sub_schema(
    schema: &Value,
    pointer: &str,
    ref_library: Option<&SchemaRefLibrary>,
    recursive_ref_map: Option<&RecursiveRefMap>,
    used_pointers: &[String],
) -> Option<Value> {
    let (Some(library), Some(map)) = (ref_library, recursive_ref_map) else {
        return pointer::get(schema, pointer).cloned();
    };
    let mut used = used_pointers.to_vec();
    used.push(pointer.to_string());
    let source = if pointer.is_empty() {
        schema.clone()
    } else {
        let short = remove_recursive_references(pointer, map, &ArrayMap::new());
        if short != pointer {
            used.push(short.clone());
        }
        library
            .get(&short)
            .or_else(|| pointer::get(schema, pointer))
            .or_else(|| pointer::get(schema, &short))?
            .clone()
    };

    Some(for_each_deep_copy(&source, pointer, WalkOrder::BottomUp, &mut |node, _| {
        if let Some(raw) = node.get("$ref").and_then(Value::as_str)
            && let Ok(target) = pointer::compile(raw)
            && !target.is_empty()
            && !used.iter().any(|p| is_sub_pointer(&target, p, true))
            && let Some(resolved) = get_sub_schema(schema, &target, Some(library), Some(map), &used)
        {
            let mut siblings = node.as_object().cloned().unwrap_or_default();
            siblings.shift_remove("$ref");
            if siblings.is_empty() {
                return resolved;
            }
            return merge_schemas(&[resolved, Value::Object(siblings)]);
        }
        if node.get("allOf").is_some_and(Value::is_array) {
            return combine_all_of(&node);
        }
        if node.get("type").and_then(Value::as_str) == Some("array")
            && node.get("required").is_some_and(Value::is_array)
        {
            return fix_required_array_properties(&node);
        }
        node
    }))
}

/// Rewrite `pointer` to its canonical, non-recursive form.
///
/// The pointer is made generic first; then, while some recursive map key is
/// an ancestor of (or equal to) it, the longest such key is replaced by its
/// target. Every rewrite makes the pointer strictly shorter, so the loop
/// ends. Pointers not touched by recursion come back generic but otherwise
/// unchanged.
pub fn remove_recursive_references(
    pointer: &str,
    recursive_ref_map: &RecursiveRefMap,
    array_map: &ArrayMap,
) -> String {
    if pointer.is_empty() {
        return String::new();
    }
    let mut current = generic_or_same(pointer, array_map);
    loop {
        let Some((from, to)) = recursive_ref_map
            .iter()
            .filter(|(from, to)| {
                is_sub_pointer(to, from, false) && is_sub_pointer(from, &current, true)
            })
            .max_by_key(|(from, _)| from.len())
        else {
            return current;
        };
        let rewritten = format!("{to}{}", &current[from.len()..]);
        trace!("remove_recursive_references: {current} -> {rewritten}");
        current = generic_or_same(&rewritten, array_map);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> RecursiveRefMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resolve(schema: &Value) -> ResolvedSchema {
        let mut diagnostics = Diagnostics::new();
        let resolved = resolve_schema_references(schema, &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty(), "{:?}", diagnostics.take());
        resolved
    }

    #[test]
    fn test_remove_recursive_references() {
        let recursive = map(&[("/a/b", "/a")]);
        let arrays = ArrayMap::new();
        assert_eq!(remove_recursive_references("/a/b/b/c", &recursive, &arrays), "/a/c");
        assert_eq!(remove_recursive_references("/a/x", &recursive, &arrays), "/a/x");
        assert_eq!(remove_recursive_references("", &recursive, &arrays), "");
        assert_eq!(remove_recursive_references("/a/bc", &recursive, &arrays), "/a/bc");
    }

    #[test]
    fn test_remove_recursive_references_generic() {
        let recursive = map(&[("/children/-", "")]);
        let arrays: ArrayMap = [("/children".to_string(), 0)].into_iter().collect();
        assert_eq!(
            remove_recursive_references("/children/3/children/0/name", &recursive, &arrays),
            "/name"
        );
    }

    #[test]
    fn test_inlines_plain_definitions() {
        let schema = json!({
            "definitions": {"name": {"type": "string", "maxLength": 5}},
            "type": "object",
            "properties": {
                "first": {"$ref": "#/definitions/name"},
                "last": {"$ref": "#/definitions/name", "title": "Last"}
            }
        });
        let resolved = resolve(&schema);
        assert_eq!(
            resolved.compiled,
            json!({
                "type": "object",
                "properties": {
                    "first": {"type": "string", "maxLength": 5},
                    "last": {"type": "string", "maxLength": 5, "title": "Last"}
                }
            })
        );
        assert!(resolved.schema_recursive_ref_map.is_empty());
    }

    #[test]
    fn test_root_recursion() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "children": {"type": "array", "items": {"$ref": "#"}}
            }
        });
        let resolved = resolve(&schema);
        assert_eq!(
            resolved.compiled["properties"]["children"]["items"],
            json!({"$ref": "#"})
        );
        assert_eq!(
            resolved.schema_recursive_ref_map.get("/properties/children/items"),
            Some(&String::new())
        );
        assert_eq!(
            resolved.data_recursive_ref_map.get("/children/-"),
            Some(&String::new())
        );
        assert_eq!(resolved.array_map.get("/children"), Some(&0));
        assert!(resolved.schema_ref_library.contains_key(""));
    }

    #[test]
    fn test_recursive_definition() {
        let schema = json!({
            "definitions": {
                "node": {
                    "type": "object",
                    "properties": {
                        "label": {"type": "string"},
                        "next": {"$ref": "#/definitions/node"}
                    }
                }
            },
            "type": "object",
            "properties": {"head": {"$ref": "#/definitions/node"}}
        });
        let resolved = resolve(&schema);
        let head = &resolved.compiled["properties"]["head"];
        assert_eq!(head["properties"]["label"], json!({"type": "string"}));
        assert_eq!(
            head["properties"]["next"],
            json!({"$ref": "#/properties/head"})
        );
        assert_eq!(
            resolved.data_recursive_ref_map.get("/head/next"),
            Some(&"/head".to_string())
        );
        assert!(resolved.compiled.get("definitions").is_none());
        assert!(resolved.schema_ref_library.contains_key("/properties/head"));
    }

    #[test]
    fn test_all_of_is_flattened() {
        let schema = json!({
            "$defs": {"base": {"type": "object", "properties": {"id": {"type": "integer"}}}},
            "allOf": [
                {"$ref": "#/$defs/base"},
                {"properties": {"name": {"type": "string"}}}
            ]
        });
        let resolved = resolve(&schema);
        assert_eq!(
            resolved.compiled,
            json!({
                "type": "object",
                "properties": {"id": {"type": "integer"}, "name": {"type": "string"}}
            })
        );
    }

    #[test]
    fn test_unresolvable_ref_is_reported() {
        let schema = json!({"properties": {"a": {"$ref": "#/definitions/missing"}}});
        let mut diagnostics = Diagnostics::new();
        let resolved = resolve_schema_references(&schema, &mut diagnostics).unwrap();
        assert!(!diagnostics.is_empty());
        assert_eq!(
            resolved.compiled["properties"]["a"],
            json!({"$ref": "#/definitions/missing"})
        );
    }

    #[test]
    fn test_get_sub_schema_plain_copy() {
        let schema = json!({"properties": {"a": {"type": "string"}}});
        assert_eq!(
            get_sub_schema(&schema, "/properties/a", None, None, &[]),
            Some(json!({"type": "string"}))
        );
        assert_eq!(get_sub_schema(&schema, "/nope", None, None, &[]), None);
    }
}
