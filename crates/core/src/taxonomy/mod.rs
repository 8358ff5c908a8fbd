//! Taxonomy resolution for product line items.
//!
//! Maps a noisy `(brand, sku, description)` triple to one authoritative
//! category via a precedence waterfall: exact SKU code, SKU containment in the
//! item description (scoped to the same brand), then the brand-level
//! dictionary. Reference mappings are deduplicated at load so each normalized
//! key has exactly one canonical category for the whole run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::item::{LineItem, ResolutionSource, ResolvedCategory};
use crate::errors::DomainError;

/// Case/space/hyphen-insensitive identity for brand names and SKU codes, so
/// variant spellings ("Coca-Cola", "coca cola", "COCACOLA") collapse to one key.
pub fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub category_code: String,
    pub category_name: String,
    pub department_code: String,
}

impl CategoryRef {
    pub fn is_unspecified(&self) -> bool {
        self.category_code == ResolvedCategory::UNSPECIFIED
    }
}

/// Brand-level reference mapping. `usage_count` is the observed transaction
/// volume behind this mapping in the source data; it drives conflict
/// resolution when two loads disagree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandMapping {
    pub brand_key: String,
    pub category: CategoryRef,
    pub usage_count: u64,
}

/// SKU-level reference mapping, scoped to a brand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuMapping {
    pub brand_key: String,
    pub sku_code: String,
    pub sku_name: Option<String>,
    pub category: CategoryRef,
    pub usage_count: u64,
}

/// Outcome of merging two mappings loaded for the same key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    KeptExisting,
    TookIncoming,
}

/// Explicit merge policy for duplicate keys: a real category always beats the
/// `"unspecified"` placeholder; between two real categories the higher usage
/// count wins, ties break on the lexicographically smaller category code.
pub fn resolve_conflict(
    existing: &CategoryRef,
    existing_usage: u64,
    incoming: &CategoryRef,
    incoming_usage: u64,
) -> MergeOutcome {
    if incoming.is_unspecified() {
        return MergeOutcome::KeptExisting;
    }
    if existing.is_unspecified() {
        return MergeOutcome::TookIncoming;
    }
    if existing.category_code == incoming.category_code {
        return MergeOutcome::KeptExisting;
    }
    if incoming_usage > existing_usage {
        MergeOutcome::TookIncoming
    } else if incoming_usage < existing_usage {
        MergeOutcome::KeptExisting
    } else if incoming.category_code < existing.category_code {
        MergeOutcome::TookIncoming
    } else {
        MergeOutcome::KeptExisting
    }
}

/// Coverage counters maintained across resolutions. Atomic so phase-1 workers
/// can share one dictionary without synchronization.
#[derive(Debug, Default)]
struct CoverageCounters {
    mapped: AtomicU64,
    unmapped: AtomicU64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageStats {
    pub mapped: u64,
    pub unmapped: u64,
}

impl CoverageStats {
    pub fn coverage_ratio(&self) -> f64 {
        let total = self.mapped + self.unmapped;
        if total == 0 {
            0.0
        } else {
            self.mapped as f64 / total as f64
        }
    }
}

/// Immutable per-run taxonomy dictionary. Built once from reference data,
/// then shared read-only across the batch.
#[derive(Debug)]
pub struct TaxonomyDictionary {
    brands: HashMap<String, BrandMapping>,
    skus: HashMap<String, SkuMapping>,
    brand_skus: HashMap<String, Vec<String>>,
    coverage: CoverageCounters,
}

impl TaxonomyDictionary {
    /// Build the dictionary from bulk-loaded reference rows, upserting by
    /// normalized key. Duplicate keys are merged via [`resolve_conflict`];
    /// `"unspecified"` placeholders shadowed by a real mapping are dropped in
    /// the process. An entirely empty dictionary is a fatal prerequisite
    /// failure.
    pub fn from_mappings(
        brand_rows: Vec<BrandMapping>,
        sku_rows: Vec<SkuMapping>,
    ) -> Result<Self, DomainError> {
        if brand_rows.is_empty() && sku_rows.is_empty() {
            return Err(DomainError::MissingReferenceData { catalog: "taxonomy_dictionary" });
        }

        let mut brands: HashMap<String, BrandMapping> = HashMap::new();
        for mut row in brand_rows {
            row.brand_key = normalize_key(&row.brand_key);
            if row.brand_key.is_empty() {
                return Err(DomainError::InvalidReferenceData(
                    "brand mapping with empty brand key".to_string(),
                ));
            }
            match brands.get_mut(&row.brand_key) {
                None => {
                    brands.insert(row.brand_key.clone(), row);
                }
                Some(existing) => merge_brand(existing, row),
            }
        }

        let mut skus: HashMap<String, SkuMapping> = HashMap::new();
        let mut brand_skus: HashMap<String, Vec<String>> = HashMap::new();
        for mut row in sku_rows {
            row.brand_key = normalize_key(&row.brand_key);
            let sku_key = normalize_key(&row.sku_code);
            if sku_key.is_empty() {
                return Err(DomainError::InvalidReferenceData(
                    "sku mapping with empty sku code".to_string(),
                ));
            }
            match skus.get_mut(&sku_key) {
                None => {
                    brand_skus.entry(row.brand_key.clone()).or_default().push(sku_key.clone());
                    skus.insert(sku_key, row);
                }
                Some(existing) => merge_sku(existing, row),
            }
        }

        // Stable containment-scan order regardless of load order.
        for sku_keys in brand_skus.values_mut() {
            sku_keys.sort();
        }

        Ok(Self { brands, skus, brand_skus, coverage: CoverageCounters::default() })
    }

    /// Resolve one line item through the waterfall. Missing brand name is not
    /// an error, it resolves to `Unmapped`.
    pub fn resolve(&self, item: &LineItem) -> ResolvedCategory {
        let resolved = self.resolve_inner(
            item.brand_name.as_deref(),
            item.sku_code.as_deref(),
            item.description.as_deref(),
        );

        match resolved.source {
            ResolutionSource::Unmapped => self.coverage.unmapped.fetch_add(1, Ordering::Relaxed),
            _ => self.coverage.mapped.fetch_add(1, Ordering::Relaxed),
        };
        resolved
    }

    fn resolve_inner(
        &self,
        brand_name: Option<&str>,
        sku_code: Option<&str>,
        description: Option<&str>,
    ) -> ResolvedCategory {
        // 1. Exact SKU-code match.
        if let Some(code) = sku_code {
            let key = normalize_key(code);
            if let Some(mapping) = self.skus.get(&key) {
                return categorize(&mapping.category, ResolutionSource::Sku);
            }
        }

        let brand_key = brand_name.map(normalize_key).filter(|key| !key.is_empty());

        // 2. SKU code or name contained in the free-text description, scoped
        //    to the item's own brand.
        if let (Some(brand_key), Some(description)) = (brand_key.as_deref(), description) {
            let haystack = description.to_lowercase();
            if let Some(sku_keys) = self.brand_skus.get(brand_key) {
                for sku_key in sku_keys {
                    let Some(mapping) = self.skus.get(sku_key) else { continue };
                    let code_hit = haystack.contains(&mapping.sku_code.to_lowercase());
                    let name_hit = mapping
                        .sku_name
                        .as_deref()
                        .is_some_and(|name| haystack.contains(&name.to_lowercase()));
                    if code_hit || name_hit {
                        return categorize(&mapping.category, ResolutionSource::Sku);
                    }
                }
            }
        }

        // 3. Brand-level dictionary.
        if let Some(brand_key) = brand_key.as_deref() {
            if let Some(mapping) = self.brands.get(brand_key) {
                if !mapping.category.is_unspecified() {
                    return categorize(&mapping.category, ResolutionSource::Brand);
                }
            }
        }

        // 4. No match.
        ResolvedCategory::unmapped()
    }

    pub fn brand_mapping(&self, brand_key: &str) -> Option<&BrandMapping> {
        self.brands.get(&normalize_key(brand_key))
    }

    pub fn brand_count(&self) -> usize {
        self.brands.len()
    }

    pub fn sku_count(&self) -> usize {
        self.skus.len()
    }

    /// Canonical brand rows after dedup, sorted by key. This is what a loader
    /// persists back; re-running a load over identical input reproduces it
    /// exactly.
    pub fn canonical_brand_rows(&self) -> Vec<BrandMapping> {
        let mut rows: Vec<BrandMapping> = self.brands.values().cloned().collect();
        rows.sort_by(|a, b| a.brand_key.cmp(&b.brand_key));
        rows
    }

    pub fn coverage(&self) -> CoverageStats {
        CoverageStats {
            mapped: self.coverage.mapped.load(Ordering::Relaxed),
            unmapped: self.coverage.unmapped.load(Ordering::Relaxed),
        }
    }
}

fn categorize(category: &CategoryRef, source: ResolutionSource) -> ResolvedCategory {
    ResolvedCategory {
        category_code: category.category_code.clone(),
        category_name: category.category_name.clone(),
        department_code: category.department_code.clone(),
        source,
    }
}

fn merge_brand(existing: &mut BrandMapping, incoming: BrandMapping) {
    if existing.category.category_code == incoming.category.category_code {
        existing.usage_count += incoming.usage_count;
        return;
    }
    let outcome = resolve_conflict(
        &existing.category,
        existing.usage_count,
        &incoming.category,
        incoming.usage_count,
    );
    if !existing.category.is_unspecified() && !incoming.category.is_unspecified() {
        warn!(
            event_name = "taxonomy.conflict",
            brand_key = %existing.brand_key,
            kept = %match outcome {
                MergeOutcome::KeptExisting => &existing.category.category_code,
                MergeOutcome::TookIncoming => &incoming.category.category_code,
            },
            "duplicate brand mapping with conflicting categories"
        );
    }
    if outcome == MergeOutcome::TookIncoming {
        *existing = incoming;
    }
}

fn merge_sku(existing: &mut SkuMapping, incoming: SkuMapping) {
    if existing.category.category_code == incoming.category.category_code {
        existing.usage_count += incoming.usage_count;
        return;
    }
    let outcome = resolve_conflict(
        &existing.category,
        existing.usage_count,
        &incoming.category,
        incoming.usage_count,
    );
    if !existing.category.is_unspecified() && !incoming.category.is_unspecified() {
        warn!(
            event_name = "taxonomy.conflict",
            sku_code = %existing.sku_code,
            kept = %match outcome {
                MergeOutcome::KeptExisting => &existing.category.category_code,
                MergeOutcome::TookIncoming => &incoming.category.category_code,
            },
            "duplicate sku mapping with conflicting categories"
        );
    }
    if outcome == MergeOutcome::TookIncoming {
        *existing = incoming;
    }
}
