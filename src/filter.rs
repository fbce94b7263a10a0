use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// Ranks candidates against `query`, best score first. Each candidate
/// is scored on both its directory name and its branch name and keeps
/// the better of the two; non-matches are excluded. The sort is stable,
/// so equal scores keep their original list order and repeated calls
/// with the same inputs produce the same ordering.
pub fn rank(query: &str, candidates: &[(String, Option<String>)]) -> Vec<usize> {
    if query.is_empty() {
        return (0..candidates.len()).collect();
    }
    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(i64, usize)> = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, (name, branch))| {
            let by_name = matcher.fuzzy_match(name, query);
            let by_branch = branch
                .as_deref()
                .and_then(|b| matcher.fuzzy_match(b, query));
            let best = match (by_name, by_branch) {
                (Some(a), Some(b)) => a.max(b),
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => return None,
            };
            Some((best, index))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, index)| index).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<(String, Option<String>)> {
        vec![
            ("main".to_string(), Some("main".to_string())),
            ("dev".to_string(), Some("dev".to_string())),
            ("feature-login".to_string(), Some("feature/login".to_string())),
            ("hotfix".to_string(), Some("hotfix/crash".to_string())),
        ]
    }

    #[test]
    fn empty_query_keeps_everything_in_order() {
        assert_eq!(rank("", &candidates()), vec![0, 1, 2, 3]);
    }

    #[test]
    fn non_matches_are_excluded() {
        let ranked = rank("zzz", &candidates());
        assert!(ranked.is_empty());
    }

    #[test]
    fn branch_name_matches_count() {
        // "crash" only appears in the branch name, not the directory.
        assert_eq!(rank("crash", &candidates()), vec![3]);
    }

    #[test]
    fn exact_name_outranks_scattered_match() {
        let ranked = rank("dev", &candidates());
        assert_eq!(ranked[0], 1);
    }

    #[test]
    fn ranking_is_deterministic() {
        let items = candidates();
        let first = rank("e", &items);
        for _ in 0..10 {
            assert_eq!(rank("e", &items), first);
        }
    }
}
