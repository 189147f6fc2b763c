//! Contract verifier.
//!
//! Read-only batch job asserting invariants over the already-built
//! artifacts. Diagnostic, never mutating: it collects itemized errors and
//! the CLI exits non-zero when any are present, since violations mean the
//! served site would be observably broken.

use std::collections::HashSet;

use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::config::Settings;
use crate::content::{self, ContentIndex};
use crate::models::{RouteContract, RouteKind};
use crate::routes;
use crate::search;

/// Result of a verification run.
#[derive(Debug, Default)]
pub struct VerifyReport {
    pub errors: Vec<String>,
    /// `(label, count)` pairs logged for human regression review.
    pub counts: Vec<(String, usize)>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn count(&mut self, label: &str, value: usize) {
        self.counts.push((label.to_string(), value));
    }
}

/// Run every invariant check over the stored artifacts.
pub fn run(artifacts: &ArtifactStore, settings: &Settings) -> anyhow::Result<VerifyReport> {
    let contract = routes::load_contract(artifacts)?;
    let index = content::load_index(artifacts)?;
    let search_records = search::load_index(artifacts)?;

    let mut report = VerifyReport::default();
    check_contract(&contract, settings, &mut report);
    check_content(&contract, &index, &mut report);

    report.count("search records", search_records.len());
    if search_records.is_empty() {
        report.error("Search index is empty");
    }

    for (label, value) in &report.counts {
        info!("{}: {}", label, value);
    }
    Ok(report)
}

/// Route-table invariants.
pub fn check_contract(contract: &RouteContract, settings: &Settings, report: &mut VerifyReport) {
    let ok_set: HashSet<&str> = contract.ok_routes().map(|r| r.path.as_str()).collect();

    report.count("canonical routes", contract.canonical.len());
    report.count("reachable extra routes", contract.reachable_extra.len());
    report.count("status overrides", contract.status_overrides.len());
    report.count("aliases", contract.aliases.len());

    // No path is simultaneously a 200-route and a non-200 override
    for override_entry in &contract.status_overrides {
        if ok_set.contains(override_entry.path.as_str()) {
            report.error(format!(
                "Path {} has status override {} but is also a 200-route",
                override_entry.path, override_entry.status
            ));
        }
        if override_entry.status == 200 {
            report.error(format!(
                "Override for {} claims status 200",
                override_entry.path
            ));
        }
    }

    // Every alias target resolves inside the 200 set
    for alias in &contract.aliases {
        if !ok_set.contains(alias.to.as_str()) {
            report.error(format!(
                "Alias {} -> {} points outside the 200 set",
                alias.from, alias.to
            ));
        }
    }

    // Regression guard against silent route loss
    if let Some(expected) = settings.site.expected_route_count {
        if ok_set.len() != expected {
            report.error(format!(
                "200-route count {} does not match expected baseline {}",
                ok_set.len(),
                expected
            ));
        }
    }
}

/// Every HTML-classified 200-route must have a content document.
pub fn check_content(contract: &RouteContract, index: &ContentIndex, report: &mut VerifyReport) {
    report.count("content documents", index.len());
    for route in contract.ok_routes().filter(|r| r.kind == RouteKind::Html) {
        if index.lookup(&route.path).is_none() {
            report.error(format!("No content document for route {}", route.path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::IndexEntry;
    use crate::models::{AliasEntry, DocumentType, RouteEntry, StatusOverride};

    fn route(path: &str, kind: RouteKind) -> RouteEntry {
        RouteEntry {
            path: path.to_string(),
            source_url: format!("https://legacy.example.org{path}"),
            kind,
        }
    }

    fn entry(path: &str) -> IndexEntry {
        IndexEntry {
            path: path.to_string(),
            doc_type: DocumentType::Page,
            file: format!("documents/page/{}.json", crate::paths::slug(path)),
        }
    }

    #[test]
    fn clean_contract_passes() {
        let contract = RouteContract {
            canonical: vec![route("/a", RouteKind::Html), route("/f.pdf", RouteKind::File)],
            reachable_extra: vec![route("/b", RouteKind::Html)],
            status_overrides: vec![StatusOverride {
                path: "/gone".to_string(),
                status: 404,
                source_url: String::new(),
            }],
            aliases: vec![AliasEntry {
                from: "/A".to_string(),
                to: "/a".to_string(),
                reason: "case-or-encoding-variant".to_string(),
            }],
        };
        let index = ContentIndex::new(vec![entry("/a"), entry("/b")]);

        let mut report = VerifyReport::default();
        check_contract(&contract, &Settings::default(), &mut report);
        check_content(&contract, &index, &mut report);
        assert!(report.is_ok(), "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn override_collision_is_an_error() {
        let contract = RouteContract {
            canonical: vec![route("/a", RouteKind::Html)],
            status_overrides: vec![StatusOverride {
                path: "/a".to_string(),
                status: 404,
                source_url: String::new(),
            }],
            ..Default::default()
        };
        let mut report = VerifyReport::default();
        check_contract(&contract, &Settings::default(), &mut report);
        assert!(!report.is_ok());
    }

    #[test]
    fn dangling_alias_is_an_error() {
        let contract = RouteContract {
            canonical: vec![route("/a", RouteKind::Html)],
            aliases: vec![AliasEntry {
                from: "/B".to_string(),
                to: "/b".to_string(),
                reason: "case-or-encoding-variant".to_string(),
            }],
            ..Default::default()
        };
        let mut report = VerifyReport::default();
        check_contract(&contract, &Settings::default(), &mut report);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn missing_document_only_matters_for_html_routes() {
        let contract = RouteContract {
            canonical: vec![route("/a", RouteKind::Html), route("/f.pdf", RouteKind::File)],
            ..Default::default()
        };
        let index = ContentIndex::new(vec![]);
        let mut report = VerifyReport::default();
        check_content(&contract, &index, &mut report);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("/a"));
    }

    #[test]
    fn route_count_baseline_guard() {
        let contract = RouteContract {
            canonical: vec![route("/a", RouteKind::Html)],
            ..Default::default()
        };
        let mut settings = Settings::default();
        settings.site.expected_route_count = Some(2);
        let mut report = VerifyReport::default();
        check_contract(&contract, &settings, &mut report);
        assert!(report.errors.iter().any(|e| e.contains("baseline")));
    }
}
