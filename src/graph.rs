//! Addon resolution graph
//!
//! The graph classifies every addon discovered during one install run against
//! the addons seen before it. The first addon registered under a name, or for
//! a url, wins; later addons are reported as duplicates, possible conflicts or
//! fatal name collisions.
//!
//! # Examples
//!
//! ```
//! use addonpm::{Addon, AddonGraph, AssetSource, ResolutionResult};
//!
//! let mut graph = AddonGraph::new();
//! let ui = Addon::new("ui", "https://x/ui.git", "main", AssetSource::Remote, "", "/p/addons.json");
//! let ui_alias = Addon::new("ui2", "https://x/ui.git", "main", AssetSource::Remote, "", "/p/dep/addons.json");
//!
//! assert!(matches!(graph.add(ui), ResolutionResult::Resolved { .. }));
//! assert!(matches!(graph.add(ui_alias), ResolutionResult::AlreadyResolved { .. }));
//! ```

use crate::addon::Addon;
use std::collections::HashMap;
use std::fmt;

/// Outcome of adding one addon to the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    /// First occurrence; the addon is now canonical for its name
    Resolved { addon: Addon },

    /// Equivalent to an addon already resolved, nothing to do
    AlreadyResolved { addon: Addon, canonical: Addon },

    /// Resolved, but shares a url with addons that differ only in subfolder
    /// or only in checkout. `canonical` is the first addon ever registered
    /// for the url and names the shared cache slot.
    ResolvedButMightConflict {
        addon: Addon,
        conflicts: Vec<Addon>,
        canonical: Addon,
    },

    /// Another, different addon already claimed this name
    CannotBeResolved { addon: Addon, existing: Addon },
}

/// How loudly a result should be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Warn,
    Error,
}

impl ResolutionResult {
    /// The addon that was added
    pub fn addon(&self) -> &Addon {
        match self {
            ResolutionResult::Resolved { addon }
            | ResolutionResult::AlreadyResolved { addon, .. }
            | ResolutionResult::ResolvedButMightConflict { addon, .. }
            | ResolutionResult::CannotBeResolved { addon, .. } => addon,
        }
    }

    /// Whether this result aborts the install phase
    pub fn is_fatal(&self) -> bool {
        matches!(self, ResolutionResult::CannotBeResolved { .. })
    }

    /// Whether the addon must be cached and installed
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            ResolutionResult::Resolved { .. } | ResolutionResult::ResolvedButMightConflict { .. }
        )
    }

    pub fn level(&self) -> ReportLevel {
        match self {
            ResolutionResult::Resolved { .. } | ResolutionResult::AlreadyResolved { .. } => {
                ReportLevel::Info
            }
            ResolutionResult::ResolvedButMightConflict { .. } => ReportLevel::Warn,
            ResolutionResult::CannotBeResolved { .. } => ReportLevel::Error,
        }
    }
}

impl fmt::Display for ResolutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionResult::Resolved { addon } => {
                write!(f, "Resolved {} from {}", addon, addon.addons_file_path.display())
            }
            ResolutionResult::AlreadyResolved { addon, canonical } => {
                if addon.name == canonical.name {
                    write!(
                        f,
                        "Skipping {} from {}: already resolved",
                        addon,
                        addon.addons_file_path.display()
                    )
                } else {
                    write!(
                        f,
                        "Skipping {} from {}: same as `{}` declared in {}",
                        addon,
                        addon.addons_file_path.display(),
                        canonical.name,
                        canonical.addons_file_path.display()
                    )
                }
            }
            ResolutionResult::ResolvedButMightConflict {
                addon,
                conflicts,
                canonical,
            } => {
                writeln!(
                    f,
                    "Resolved {} from {}, but it shares a url with:",
                    addon,
                    addon.addons_file_path.display()
                )?;
                for conflict in conflicts {
                    writeln!(
                        f,
                        "  - {} from {}",
                        conflict,
                        conflict.addons_file_path.display()
                    )?;
                }
                write!(
                    f,
                    "Both copies will be installed from the `{}` cache; make sure they can coexist",
                    canonical.name
                )
            }
            ResolutionResult::CannotBeResolved { addon, existing } => write!(
                f,
                "Cannot resolve {} from {}: the name `{}` is already used by {} from {}",
                addon,
                addon.addons_file_path.display(),
                addon.name,
                existing,
                existing.addons_file_path.display()
            ),
        }
    }
}

/// Name and url indices for one install run
///
/// Canonical addons live in `addons`; both indices point into it, so every
/// name entry is also present in exactly one url bucket.
#[derive(Debug, Default)]
pub struct AddonGraph {
    addons: Vec<Addon>,
    by_name: HashMap<String, usize>,
    by_url: HashMap<String, Vec<usize>>,
}

impl AddonGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `addon` against everything added so far
    pub fn add(&mut self, addon: Addon) -> ResolutionResult {
        if let Some(&index) = self.by_name.get(&addon.name) {
            let existing = &self.addons[index];
            return if existing.is_equivalent_to(&addon) {
                ResolutionResult::AlreadyResolved {
                    canonical: existing.clone(),
                    addon,
                }
            } else {
                ResolutionResult::CannotBeResolved {
                    existing: existing.clone(),
                    addon,
                }
            };
        }

        let Some(bucket) = self.by_url.get(addon.url()) else {
            self.register(addon.clone());
            return ResolutionResult::Resolved { addon };
        };

        let mut conflicts = Vec::new();
        for &index in bucket {
            let existing = &self.addons[index];
            let same_subfolder = existing.subfolder == addon.subfolder;
            let same_checkout = existing.checkout() == addon.checkout();

            // An alias of an existing addon: its name is deliberately not indexed.
            if same_subfolder && same_checkout {
                return ResolutionResult::AlreadyResolved {
                    canonical: existing.clone(),
                    addon,
                };
            }

            if same_subfolder != same_checkout {
                conflicts.push(existing.clone());
            }
        }

        let canonical = self.addons[bucket[0]].clone();
        self.register(addon.clone());

        if conflicts.is_empty() {
            ResolutionResult::Resolved { addon }
        } else {
            ResolutionResult::ResolvedButMightConflict {
                addon,
                conflicts,
                canonical,
            }
        }
    }

    /// Canonical addon registered under `name`
    pub fn get(&self, name: &str) -> Option<&Addon> {
        self.by_name.get(name).map(|&i| &self.addons[i])
    }

    /// Number of canonical addons
    pub fn len(&self) -> usize {
        self.addons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addons.is_empty()
    }

    fn register(&mut self, addon: Addon) {
        let index = self.addons.len();
        self.by_name.insert(addon.name.clone(), index);
        self.by_url
            .entry(addon.url().to_string())
            .or_default()
            .push(index);
        self.addons.push(addon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::AssetSource;

    fn addon(name: &str, url: &str, subfolder: &str, checkout: &str) -> Addon {
        Addon::new(
            name,
            url,
            checkout,
            AssetSource::Remote,
            subfolder,
            "/project/addons.json",
        )
    }

    #[test]
    fn test_first_addon_resolves() {
        let mut graph = AddonGraph::new();
        let a = addon("A", "u1", "/", "main");

        assert_eq!(
            graph.add(a.clone()),
            ResolutionResult::Resolved { addon: a.clone() }
        );
        assert_eq!(graph.get("A"), Some(&a));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_exact_duplicate_under_same_name() {
        let mut graph = AddonGraph::new();
        let a = addon("A", "u", "/", "main");
        let mut a2 = a.clone();
        a2.addons_file_path = "/project/addons/other/addons.json".into();

        graph.add(a.clone());
        assert_eq!(
            graph.add(a2.clone()),
            ResolutionResult::AlreadyResolved {
                addon: a2,
                canonical: a
            }
        );
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_name_collision_with_different_identity() {
        let mut graph = AddonGraph::new();
        let a = addon("A", "u1", "/", "main");
        let b = addon("A", "u2", "/", "main");

        graph.add(a.clone());
        let result = graph.add(b.clone());
        assert_eq!(
            result,
            ResolutionResult::CannotBeResolved {
                addon: b,
                existing: a.clone()
            }
        );
        assert!(result.is_fatal());
        assert_eq!(graph.get("A"), Some(&a));
    }

    #[test]
    fn test_name_collision_on_checkout_only() {
        let mut graph = AddonGraph::new();
        graph.add(addon("A", "u", "", "main"));
        assert!(graph.add(addon("A", "u", "", "v2")).is_fatal());
    }

    #[test]
    fn test_alias_is_deduplicated() {
        let mut graph = AddonGraph::new();
        let a = addon("A", "u", "/", "main");
        let a2 = addon("A2", "u", "/", "main");

        graph.add(a.clone());
        assert_eq!(
            graph.add(a2.clone()),
            ResolutionResult::AlreadyResolved {
                addon: a2,
                canonical: a
            }
        );
        assert!(graph.get("A2").is_none());
    }

    #[test]
    fn test_alias_name_is_not_tracked() {
        let mut graph = AddonGraph::new();
        graph.add(addon("A", "u", "", "main"));
        graph.add(addon("A2", "u", "", "main"));

        // A2 was only an alias, so a different addon may still take the name.
        let other = addon("A2", "u3", "", "main");
        assert_eq!(
            graph.add(other.clone()),
            ResolutionResult::Resolved { addon: other }
        );
    }

    #[test]
    fn test_subfolder_only_conflict() {
        let mut graph = AddonGraph::new();
        let a = addon("A", "u", "/", "main");
        let a2 = addon("A2", "u", "sub/", "main");

        graph.add(a.clone());
        let result = graph.add(a2.clone());
        assert_eq!(
            result,
            ResolutionResult::ResolvedButMightConflict {
                addon: a2.clone(),
                conflicts: vec![a.clone()],
                canonical: a
            }
        );
        assert!(result.is_resolved());
        assert_eq!(result.level(), ReportLevel::Warn);
        assert_eq!(graph.get("A2"), Some(&a2));
    }

    #[test]
    fn test_checkout_only_conflict() {
        let mut graph = AddonGraph::new();
        let a = addon("A", "u", "", "main");
        let b = addon("B", "u", "", "v1.0");

        graph.add(a.clone());
        assert!(matches!(
            graph.add(b),
            ResolutionResult::ResolvedButMightConflict { conflicts, .. } if conflicts == vec![a]
        ));
    }

    #[test]
    fn test_same_url_unrelated_addon_resolves_cleanly() {
        let mut graph = AddonGraph::new();
        graph.add(addon("A", "u", "one", "main"));
        let b = addon("B", "u", "two", "dev");

        assert_eq!(
            graph.add(b.clone()),
            ResolutionResult::Resolved { addon: b }
        );
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_unrelated_urls() {
        let mut graph = AddonGraph::new();
        let a = addon("A", "u1", "", "main");
        let b = addon("B", "u2", "", "main");

        assert_eq!(graph.add(a.clone()), ResolutionResult::Resolved { addon: a });
        assert_eq!(graph.add(b.clone()), ResolutionResult::Resolved { addon: b });
    }

    #[test]
    fn test_canonical_is_first_addon_for_url() {
        let mut graph = AddonGraph::new();
        let first = addon("First", "u", "x", "main");
        graph.add(first.clone());
        graph.add(addon("Second", "u", "y", "dev"));

        // Conflicts only with Second (same checkout), but First names the cache slot.
        let third = addon("Third", "u", "z", "dev");
        match graph.add(third) {
            ResolutionResult::ResolvedButMightConflict {
                conflicts,
                canonical,
                ..
            } => {
                assert_eq!(canonical, first);
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].name, "Second");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_exact_match_wins_over_conflicts() {
        let mut graph = AddonGraph::new();
        graph.add(addon("A", "u", "", "dev"));
        let b = addon("B", "u", "", "main");
        graph.add(b.clone());

        let alias = addon("C", "u", "", "main");
        assert_eq!(
            graph.add(alias.clone()),
            ResolutionResult::AlreadyResolved {
                addon: alias,
                canonical: b
            }
        );
    }

    #[test]
    fn test_messages() {
        let mut graph = AddonGraph::new();
        graph.add(addon("A", "u1", "", "main"));
        let fatal = graph.add(addon("A", "u2", "", "main"));
        let message = fatal.to_string();
        assert!(message.contains("Cannot resolve"));
        assert!(message.contains("u1"));
        assert!(message.contains("u2"));
        assert_eq!(fatal.level(), ReportLevel::Error);
        assert_eq!(fatal.addon().url(), "u2");
    }
}
