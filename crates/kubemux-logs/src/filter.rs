use kubemux_types::{AggregationConfig, MatchMode, NamespaceScope, Target};

use crate::error::NoTargetsError;

/// Pod name query applied after discovery
#[derive(Clone, Debug)]
pub struct TargetFilter {
    /// Case-sensitive substrings of the pod name
    terms: Vec<String>,

    mode: MatchMode,

    /// Label selectors already applied by discovery, kept for diagnostics
    labels: Vec<String>,

    namespace: NamespaceScope,
}

impl TargetFilter {
    /// Create a filter from query terms
    pub fn new(terms: Vec<String>, mode: MatchMode) -> Self {
        Self {
            terms,
            mode,
            labels: Vec::new(),
            namespace: NamespaceScope::Current,
        }
    }

    /// Create the filter described by a run configuration
    pub fn from_config(config: &AggregationConfig) -> Self {
        Self::new(config.query.clone(), config.match_mode)
            .with_labels(config.labels.clone())
            .with_namespace(config.namespace.clone())
    }

    /// Record the label selectors used during discovery
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Record the namespace scope used during discovery
    pub fn with_namespace(mut self, namespace: NamespaceScope) -> Self {
        self.namespace = namespace;
        self
    }

    /// Check if a target's name satisfies the query
    pub fn matches(&self, target: &Target) -> bool {
        // Label-only selection already happened at discovery time
        if self.terms.is_empty() {
            return true;
        }

        match self.mode {
            MatchMode::All => self.terms.iter().all(|t| target.name.contains(t.as_str())),
            MatchMode::Any => self.terms.iter().any(|t| target.name.contains(t.as_str())),
        }
    }

    /// Keep the matching targets in input order; an empty result is an error
    pub fn apply(&self, targets: Vec<Target>) -> Result<Vec<Target>, NoTargetsError> {
        let kept: Vec<Target> = targets.into_iter().filter(|t| self.matches(t)).collect();

        if kept.is_empty() {
            return Err(NoTargetsError {
                query: self.terms.clone(),
                labels: self.labels.clone(),
                match_mode: self.mode,
                namespace: self.namespace.clone(),
            });
        }
        Ok(kept)
    }

    /// Check if the filter has no query terms (matches everything)
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(names: &[&str]) -> Vec<Target> {
        names.iter().map(|n| Target::new(*n, "default")).collect()
    }

    fn terms(t: &[&str]) -> Vec<String> {
        t.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_match_all_requires_every_term() {
        let filter = TargetFilter::new(terms(&["api", "v2"]), MatchMode::All);
        assert!(filter.matches(&Target::new("api-v2-worker", "default")));
        assert!(!filter.matches(&Target::new("api-v1-worker", "default")));
    }

    #[test]
    fn test_match_any_requires_one_term() {
        let filter = TargetFilter::new(terms(&["svc-a", "svc-b"]), MatchMode::Any);
        let kept = filter.apply(targets(&["svc-a-1", "svc-c-1"])).unwrap();
        assert_eq!(kept, targets(&["svc-a-1"]));
    }

    #[test]
    fn test_empty_query_passes_everything() {
        for mode in [MatchMode::All, MatchMode::Any] {
            let filter = TargetFilter::new(Vec::new(), mode);
            assert!(filter.is_empty());
            let kept = filter.apply(targets(&["a", "b", "c"])).unwrap();
            assert_eq!(kept, targets(&["a", "b", "c"]));
        }
    }

    #[test]
    fn test_matching_is_case_sensitive_and_keeps_order() {
        let filter = TargetFilter::new(terms(&["web"]), MatchMode::Any);
        let kept = filter
            .apply(targets(&["web-2", "WEB-1", "db-0", "web-0"]))
            .unwrap();
        assert_eq!(kept, targets(&["web-2", "web-0"]));
    }

    #[test]
    fn test_no_match_is_an_error_with_context() {
        let filter = TargetFilter::new(terms(&["nope"]), MatchMode::All)
            .with_labels(vec!["app=api".into()])
            .with_namespace(NamespaceScope::Named("prod".into()));

        let err = filter.apply(targets(&["api-0"])).unwrap_err();
        assert_eq!(err.query, terms(&["nope"]));
        assert_eq!(err.labels, vec!["app=api".to_string()]);
        assert_eq!(err.match_mode, MatchMode::All);

        // Nothing discovered at all is the same condition
        assert!(TargetFilter::new(Vec::new(), MatchMode::Any).apply(Vec::new()).is_err());
    }
}
