use std::collections::HashSet;

use laminark_types::{GraphNode, NodeType};

/// Common abbreviation pairs checked case-insensitively in both directions
/// (§4.5). Not exhaustive — a short table covering the names that show up
/// most often in this domain.
const ABBREVIATION_PAIRS: &[(&str, &str)] = &[
    ("typescript", "ts"),
    ("javascript", "js"),
    ("python", "py"),
    ("kubernetes", "k8s"),
    ("configuration", "config"),
    ("authentication", "auth"),
    ("authorization", "authz"),
    ("database", "db"),
    ("repository", "repo"),
    ("environment", "env"),
    ("documentation", "docs"),
];

/// A pair of nodes that look like the same entity, with the rule that
/// surfaced the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCandidate {
    pub a: uuid::Uuid,
    pub b: uuid::Uuid,
    pub rule: MatchRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    CaseInsensitiveEquality,
    Abbreviation,
    PathSuffix,
    Fuzzy,
}

fn normalize_path(name: &str) -> String {
    name.replace('\\', "/").replace("./", "").to_lowercase()
}

fn is_abbreviation_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    ABBREVIATION_PAIRS
        .iter()
        .any(|(long, short)| (a == *long && b == *short) || (a == *short && b == *long))
}

fn path_suffix_match(a: &str, b: &str) -> bool {
    let (a, b) = (normalize_path(a), normalize_path(b));
    a != b && (a.ends_with(&b) || b.ends_with(&a))
}

/// Exact-and-near-exact duplicate detection (§4.5): case-insensitive name
/// equality, the abbreviation table, and File path-suffix matches. Does not
/// include the Levenshtein/Jaccard fuzzy pass — that's `find_fuzzy_duplicates`,
/// used only by curation, since it's expensive and approximate.
pub fn find_duplicate_entities(nodes: &[GraphNode]) -> Vec<DuplicateCandidate> {
    let mut candidates = Vec::new();
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            let (a, b) = (&nodes[i], &nodes[j]);
            if a.node_type != b.node_type {
                continue;
            }

            if a.name.to_lowercase() == b.name.to_lowercase() {
                candidates.push(DuplicateCandidate {
                    a: a.id,
                    b: b.id,
                    rule: MatchRule::CaseInsensitiveEquality,
                });
                continue;
            }

            if is_abbreviation_match(&a.name, &b.name) {
                candidates.push(DuplicateCandidate { a: a.id, b: b.id, rule: MatchRule::Abbreviation });
                continue;
            }

            if a.node_type == NodeType::File && path_suffix_match(&a.name, &b.name) {
                candidates.push(DuplicateCandidate { a: a.id, b: b.id, rule: MatchRule::PathSuffix });
            }
        }
    }
    candidates
}

fn tokenize(name: &str) -> HashSet<String> {
    name.to_lowercase()
        .split(|c: char| "/._-".contains(c))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Levenshtein edit distance, classic DP table.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    let mut row: Vec<usize> = (0..=m).collect();

    for i in 1..=n {
        let mut prev_diag = row[0];
        row[0] = i;
        for j in 1..=m {
            let cur = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev_diag
            } else {
                1 + prev_diag.min(row[j - 1]).min(row[j])
            };
            prev_diag = cur;
        }
    }
    row[m]
}

const FUZZY_LEVENSHTEIN_MAX: usize = 2;
const FUZZY_JACCARD_MIN: f64 = 0.7;

/// Levenshtein distance ≤ 2 or Jaccard ≥ 0.7 over `/._-`-tokenized names
/// (§4.5). Used only by curation's entity-dedup step — too approximate to
/// run unsupervised on the write path.
pub fn find_fuzzy_duplicates(nodes: &[GraphNode]) -> Vec<DuplicateCandidate> {
    let mut candidates = Vec::new();
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            let (a, b) = (&nodes[i], &nodes[j]);
            if a.node_type != b.node_type || a.name.to_lowercase() == b.name.to_lowercase() {
                continue;
            }

            let distance = levenshtein(&a.name.to_lowercase(), &b.name.to_lowercase());
            let similarity = jaccard(&tokenize(&a.name), &tokenize(&b.name));

            if distance <= FUZZY_LEVENSHTEIN_MAX || similarity >= FUZZY_JACCARD_MIN {
                candidates.push(DuplicateCandidate { a: a.id, b: b.id, rule: MatchRule::Fuzzy });
            }
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use laminark_types::ProjectTag;
    use std::collections::BTreeSet;

    fn node(name: &str, node_type: NodeType) -> GraphNode {
        GraphNode {
            id: uuid::Uuid::new_v4(),
            project_tag: ProjectTag::new("proj"),
            node_type,
            name: name.to_string(),
            metadata: serde_json::Map::new(),
            observation_ids: BTreeSet::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn case_insensitive_equality_matches() {
        let nodes = vec![node("React", NodeType::Reference), node("react", NodeType::Reference)];
        let candidates = find_duplicate_entities(&nodes);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].rule, MatchRule::CaseInsensitiveEquality);
    }

    #[test]
    fn abbreviation_pairs_match() {
        let nodes = vec![node("TypeScript", NodeType::Reference), node("TS", NodeType::Reference)];
        let candidates = find_duplicate_entities(&nodes);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].rule, MatchRule::Abbreviation);
    }

    #[test]
    fn file_path_suffix_matches() {
        let nodes = vec![node("src/core/mod.rs", NodeType::File), node("./core/mod.rs", NodeType::File)];
        let candidates = find_duplicate_entities(&nodes);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].rule, MatchRule::PathSuffix);
    }

    #[test]
    fn different_types_never_match() {
        let nodes = vec![node("auth", NodeType::File), node("auth", NodeType::Decision)];
        assert!(find_duplicate_entities(&nodes).is_empty());
    }

    #[test]
    fn fuzzy_finder_catches_small_edits() {
        let nodes = vec![node("databse", NodeType::Decision), node("database", NodeType::Decision)];
        let candidates = find_fuzzy_duplicates(&nodes);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn fuzzy_finder_catches_token_overlap() {
        let nodes =
            vec![node("src/core/auth.rs", NodeType::File), node("core-auth-module", NodeType::File)];
        let candidates = find_fuzzy_duplicates(&nodes);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn fuzzy_finder_skips_unrelated_names() {
        let nodes = vec![node("database", NodeType::Decision), node("frontend routing", NodeType::Decision)];
        assert!(find_fuzzy_duplicates(&nodes).is_empty());
    }
}
