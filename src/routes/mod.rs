//! Route contract builder.
//!
//! Reconciles the discovery sources (sitemap, crawl, status probes) into
//! one canonical truth table with alias normalization.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info};

use crate::artifacts::ArtifactStore;
use crate::discovery::DiscoveryInputs;
use crate::models::{AliasEntry, RouteContract, RouteEntry, RouteKind, StatusOverride};
use crate::paths;

/// Reason tag recorded on detected aliases.
const ALIAS_REASON: &str = "case-or-encoding-variant";

/// Merge discovery inputs into the four route tables.
///
/// 1. `canonical` = normalized sitemap paths.
/// 2. `reachable_extra` = crawl paths not already canonical.
/// 3. `status_overrides` = non-OK paths with their probed status; a missing
///    status lookup defaults to 404, and a record that would claim 200 is
///    dropped outright (it would contradict its own membership in the
///    non-OK list).
/// 4. Aliases: known-200 paths grouped by case/decoding-insensitive key;
///    each group of two or more elects one canonical member and records the
///    rest as aliases pointing at it.
pub fn build_contract(inputs: &DiscoveryInputs) -> RouteContract {
    let mut canonical: Vec<RouteEntry> = Vec::new();
    let mut seen = HashSet::new();
    for route in &inputs.sitemap {
        let path = paths::normalize(&route.path);
        if seen.insert(path.clone()) {
            canonical.push(route_entry(path, route.source_url.clone()));
        }
    }

    let mut reachable_extra: Vec<RouteEntry> = Vec::new();
    for route in &inputs.reachable {
        let path = paths::normalize(&route.path);
        if seen.insert(path.clone()) {
            reachable_extra.push(route_entry(path, route.source_url.clone()));
        }
    }

    let statuses: HashMap<String, u16> = inputs
        .statuses
        .iter()
        .map(|(p, s)| (paths::normalize(p), *s))
        .collect();

    let mut status_overrides: Vec<StatusOverride> = Vec::new();
    let mut override_seen = HashSet::new();
    for route in &inputs.non_ok {
        let path = paths::normalize(&route.path);
        if !override_seen.insert(path.clone()) {
            continue;
        }
        let status = statuses.get(&path).copied().unwrap_or(404);
        if status == 200 {
            debug!("Dropping contradictory 200 override for {}", path);
            continue;
        }
        status_overrides.push(StatusOverride {
            path,
            status,
            source_url: route.source_url.clone(),
        });
    }

    let aliases = detect_aliases(canonical.iter().chain(reachable_extra.iter()));

    info!(
        "Route contract: {} canonical, {} extra, {} overrides, {} aliases",
        canonical.len(),
        reachable_extra.len(),
        status_overrides.len(),
        aliases.len()
    );

    RouteContract {
        canonical,
        reachable_extra,
        status_overrides,
        aliases,
    }
}

fn route_entry(path: String, source_url: String) -> RouteEntry {
    let kind = match paths::file_extension(&path) {
        Some(ext) if crate::config::FILE_EXTENSIONS.contains(&ext.as_str()) => RouteKind::File,
        _ => RouteKind::Html,
    };
    RouteEntry {
        path,
        source_url,
        kind,
    }
}

/// Group 200 paths by fold key and elect a canonical member per group.
///
/// Tie-break order: prefer the already-lowercase spelling, then the
/// non-percent-encoded one, then the lexicographically smallest. The
/// heuristic is preserved from the source system for compatibility; it is
/// an assumption, not a guaranteed business rule.
fn detect_aliases<'a>(ok_routes: impl Iterator<Item = &'a RouteEntry>) -> Vec<AliasEntry> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for route in ok_routes {
        groups
            .entry(paths::fold_key(&route.path))
            .or_default()
            .push(route.path.clone());
    }

    let mut aliases = Vec::new();
    for (_, mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        members.sort();
        members.dedup();
        if members.len() < 2 {
            continue;
        }
        let target = elect_canonical(&members);
        for member in members {
            if member != target {
                aliases.push(AliasEntry {
                    from: member,
                    to: target.clone(),
                    reason: ALIAS_REASON.to_string(),
                });
            }
        }
    }
    aliases
}

fn elect_canonical(members: &[String]) -> String {
    members
        .iter()
        .min_by_key(|m| {
            (
                // Lowercase spellings first
                **m != m.to_lowercase(),
                // Then non-percent-encoded ones
                m.contains('%'),
                // Then lexicographic
                (*m).clone(),
            )
        })
        .expect("alias group is non-empty")
        .clone()
}

/// Persist the four route tables as artifacts.
pub fn store_contract(store: &ArtifactStore, contract: &RouteContract) -> anyhow::Result<()> {
    store.write_json(&store.canonical_routes_path(), &contract.canonical)?;
    store.write_json(&store.reachable_extra_path(), &contract.reachable_extra)?;
    store.write_json(&store.status_overrides_path(), &contract.status_overrides)?;
    store.write_json(&store.aliases_path(), &contract.aliases)?;
    Ok(())
}

/// Load the route contract back from artifacts.
pub fn load_contract(store: &ArtifactStore) -> anyhow::Result<RouteContract> {
    Ok(RouteContract {
        canonical: store.read_json(&store.canonical_routes_path())?,
        reachable_extra: store.read_json(&store.reachable_extra_path())?,
        status_overrides: store.read_json(&store.status_overrides_path())?,
        aliases: store.read_json(&store.aliases_path())?,
    })
}
