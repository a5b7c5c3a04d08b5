//! # Cypher query construction
//!
//! Queries are assembled by plain textual substitution: labels,
//! relationship names, attribute names and WHERE clauses are pasted into
//! the query text as given, while data values travel separately as
//! `$name` parameters.
//!
//! Nothing here quotes or validates identifiers. Callers passing
//! untrusted strings as labels or clauses get exactly that text in the
//! query.

use crate::model::{PropertyMap, Value};

/// Cypher text plus its parameter bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub text: String,
    pub params: PropertyMap,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), params: PropertyMap::new() }
    }

    /// Bind `$key` to `value`.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Bind every entry of `params`, replacing earlier bindings of the same name.
    pub fn params(mut self, params: PropertyMap) -> Self {
        self.params.extend(params);
        self
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Query::new(text)
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Query::new(text)
    }
}

// ============================================================================
// Builders
// ============================================================================

/// `MATCH (n:<label> {id:$id}) RETURN n`
pub fn node_by_label_and_id(label: &str) -> String {
    format!("MATCH (n:{label} {{id:$id}}) RETURN n")
}

/// `MATCH (n:<label>) WHERE <clause> RETURN n`
///
/// The clause must refer to the node as `n`, e.g. `n.gender = 'M' AND n.ht > 70`.
pub fn nodes_by_label_and_clause(label: &str, clause: &str) -> String {
    format!("MATCH (n:{label}) WHERE {clause} RETURN n")
}

/// Nodes reached from `(n:<label> {id:$id})` over outgoing `<rel_name>`
/// relationships, returned as `m`, optionally ordered by one of their
/// attributes.
pub fn children(label: &str, rel_name: &str, order: Option<&str>) -> String {
    let mut cypher = format!("MATCH (n:{label} {{id:$id}})-[:{rel_name}]->(m) RETURN m");
    if let Some(attr) = order.filter(|a| !a.is_empty()) {
        cypher.push_str(" ORDER BY m.");
        cypher.push_str(attr);
    }
    cypher
}

/// `1 + max(n.id)` over nodes with `<label>`, optionally narrowed by an
/// inline property pattern such as `type:'soc', subtype:'post'`.
/// The result column is `max_value`.
pub fn next_id(label: &str, clause: Option<&str>) -> String {
    match clause.filter(|c| !c.is_empty()) {
        None => format!("MATCH (n:{label}) RETURN 1+max(n.id) AS max_value"),
        Some(c) => format!("MATCH (n:{label} {{{c}}}) RETURN 1+max(n.id) AS max_value"),
    }
}

/// `CREATE (:<label> {k1: $k1, k2: $k2, ...})`
///
/// Keys are emitted in sorted order.
pub fn create_node<'a>(label: &str, keys: impl IntoIterator<Item = &'a str>) -> String {
    let mut keys: Vec<&str> = keys.into_iter().collect();
    keys.sort_unstable();
    let attributes = keys
        .iter()
        .map(|k| format!("{k}: ${k}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE (:{label} {{{attributes}}})")
}

/// Set one attribute on the `<label>` node whose `id` property is `$node_id`
/// to `$new_attribute_value`.
pub fn set_attribute_by_id(label: &str, attribute: &str) -> String {
    format!("MATCH (n:{label}) WHERE n.id = $node_id SET n.{attribute} = $new_attribute_value")
}

// ============================================================================
// Projection columns
// ============================================================================

/// Column names the final top-level `RETURN` (or, failing that, `YIELD`)
/// projects, in the order written.
///
/// Aliased items take the alias; bare items take their expression text,
/// which is how the server names them. `RETURN *` and queries without a
/// projection give an empty list.
pub fn projection_columns(text: &str) -> Vec<String> {
    let words = top_level_words(text);
    let Some(i) = words
        .iter()
        .rposition(|w| w.upper == "RETURN")
        .or_else(|| words.iter().rposition(|w| w.upper == "YIELD"))
    else {
        return Vec::new();
    };

    let start = words[i].end;
    let end = words[i + 1..]
        .iter()
        .find(|w| matches!(w.upper.as_str(), "ORDER" | "SKIP" | "LIMIT" | "UNION" | "WHERE" | "RETURN"))
        .map_or(text.len(), |w| w.start);

    let mut body = text[start..end].trim();
    let distinct = top_level_words(body)
        .first()
        .filter(|w| w.start == 0 && w.upper == "DISTINCT")
        .map(|w| w.end);
    if let Some(end) = distinct {
        body = body[end..].trim();
    }
    if body == "*" {
        return Vec::new();
    }

    split_top_level(body)
        .into_iter()
        .map(column_name)
        .filter(|c| !c.is_empty())
        .collect()
}

struct Word {
    start: usize,
    end: usize,
    upper: String,
}

/// Walk `text`, calling `f(byte_index, char, top_level)` for every char.
/// `top_level` is false inside quotes, backticks and any bracket pair.
fn walk(text: &str, mut f: impl FnMut(usize, char, bool)) {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            f(i, c, false);
            if escaped {
                escaped = false;
            } else if c == '\\' && q != '`' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                f(i, c, false);
            }
            '(' | '[' | '{' => {
                depth += 1;
                f(i, c, false);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                f(i, c, false);
            }
            _ => f(i, c, depth == 0),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Bare words at bracket depth zero. Property keys (`n.limit`) and
/// parameters (`$limit`) are skipped.
fn top_level_words(text: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current: Option<usize> = None;
    let mut skip = false;
    let mut prev = ' ';
    walk(text, |i, c, top| {
        if top && is_word_char(c) {
            if current.is_none() {
                current = Some(i);
                skip = prev == '.' || prev == '$' || prev.is_alphanumeric();
            }
        } else if let Some(start) = current.take() {
            push_word(text, start, i, skip, &mut words);
        }
        prev = c;
    });
    if let Some(start) = current {
        push_word(text, start, text.len(), skip, &mut words);
    }
    words
}

fn push_word(text: &str, start: usize, end: usize, skip: bool, words: &mut Vec<Word>) {
    if !skip {
        words.push(Word { start, end, upper: text[start..end].to_ascii_uppercase() });
    }
}

fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut last = 0;
    walk(body, |i, c, top| {
        if top && c == ',' {
            parts.push(&body[last..i]);
            last = i + 1;
        }
    });
    parts.push(&body[last..]);
    parts
}

fn column_name(item: &str) -> String {
    let item = item.trim();
    match top_level_words(item).iter().rev().find(|w| w.upper == "AS") {
        Some(alias) => item[alias.end..].trim().trim_matches('`').to_string(),
        None => item.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_columns_aliases_and_bare_items() {
        assert_eq!(
            projection_columns("MATCH (n:OC_biomarker_type) RETURN n.classification AS cls, n.subtype AS sub"),
            vec!["cls", "sub"]
        );
        assert_eq!(
            projection_columns("MATCH (r)-->(b) RETURN b.name, r.value ORDER BY r.value LIMIT $limit"),
            vec!["b.name", "r.value"]
        );
        assert_eq!(
            projection_columns("MATCH (n:BA) RETURN 1+max(n.id) AS max_value"),
            vec!["max_value"]
        );
    }

    #[test]
    fn test_projection_columns_ignores_nested_and_quoted_commas() {
        assert_eq!(
            projection_columns(
                "MATCH (n) RETURN DISTINCT coalesce(n.a, 'x, y') AS `a, b`, [x IN n.l WHERE x > 1 | x] AS l, n.return"
            ),
            vec!["a, b", "l", "n.return"]
        );
    }

    #[test]
    fn test_projection_columns_uses_final_return() {
        assert_eq!(
            projection_columns("CALL { MATCH (m) RETURN m } WITH m RETURN m.id AS id"),
            vec!["id"]
        );
        assert_eq!(
            projection_columns("SHOW DATABASES YIELD name, currentStatus WHERE name <> 'system'"),
            vec!["name", "currentStatus"]
        );
        assert!(projection_columns("MATCH (n) RETURN *").is_empty());
        assert!(projection_columns("CREATE (:OC_test {id: $id})").is_empty());
    }

    #[test]
    fn test_node_by_label_and_id() {
        assert_eq!(
            node_by_label_and_id("OC_subject"),
            "MATCH (n:OC_subject {id:$id}) RETURN n"
        );
    }

    #[test]
    fn test_nodes_by_label_and_clause_pastes_clause() {
        assert_eq!(
            nodes_by_label_and_clause("OC_subject", "n.gender = 'M' AND n.ht > 70"),
            "MATCH (n:OC_subject) WHERE n.gender = 'M' AND n.ht > 70 RETURN n"
        );
    }

    #[test]
    fn test_children_with_and_without_order() {
        assert_eq!(
            children("OC_subject", "HAS_SAMPLING", None),
            "MATCH (n:OC_subject {id:$id})-[:HAS_SAMPLING]->(m) RETURN m"
        );
        assert_eq!(
            children("OC_subject", "HAS_SAMPLING", Some("date_collected")),
            "MATCH (n:OC_subject {id:$id})-[:HAS_SAMPLING]->(m) RETURN m ORDER BY m.date_collected"
        );
        assert_eq!(
            children("OC_subject", "HAS_SAMPLING", Some("")),
            children("OC_subject", "HAS_SAMPLING", None)
        );
    }

    #[test]
    fn test_next_id_clause_is_inline_pattern() {
        assert_eq!(
            next_id("BA", None),
            "MATCH (n:BA) RETURN 1+max(n.id) AS max_value"
        );
        assert_eq!(next_id("BA", Some("")), next_id("BA", None));
        assert_eq!(
            next_id("BA", Some("type:'soc', subtype:'post'")),
            "MATCH (n:BA {type:'soc', subtype:'post'}) RETURN 1+max(n.id) AS max_value"
        );
    }

    #[test]
    fn test_create_node_sorted_keys() {
        assert_eq!(
            create_node("OC_test", ["id", "gender"]),
            "CREATE (:OC_test {gender: $gender, id: $id})"
        );
        assert_eq!(create_node("OC_test", []), "CREATE (:OC_test {})");
    }

    #[test]
    fn test_set_attribute_by_id() {
        assert_eq!(
            set_attribute_by_id("OC_subject", "name"),
            "MATCH (n:OC_subject) WHERE n.id = $node_id SET n.name = $new_attribute_value"
        );
    }

    #[test]
    fn test_query_params_merge() {
        let mut extra = PropertyMap::new();
        extra.insert("b".into(), Value::Int(2));
        extra.insert("a".into(), Value::Int(10));
        let q = Query::new("RETURN $a, $b").param("a", 1).params(extra);
        assert_eq!(q.params.get("a"), Some(&Value::Int(10)));
        assert_eq!(q.params.get("b"), Some(&Value::Int(2)));
    }
}
