//! Action search and vendor aggregation.
//!
//! The remote filter language handles exact vendor matches and single-token
//! name substrings well, but returns nothing for multi-token substrings. Name
//! searches therefore try, in order:
//!
//! 1. the remote filter with the full query,
//! 2. the remote filter with only the longest token, then the full query
//!    applied locally to that candidate set,
//! 3. a full catalog scan (cached when fresh) with the full query applied
//!    locally.
//!
//! Every tier's results are passed through the same local predicate as the
//! full scan, so the tier only affects latency, never the answer.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use fusion_client::{ActivitiesApi, CatalogEntry, Fql};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{DomainError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Query
// ─────────────────────────────────────────────────────────────────────────────

/// A stateless action query. All set filters must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Case-insensitive name substring.
    pub text: Option<String>,
    /// Case-insensitive exact vendor.
    pub vendor: Option<String>,
    /// Case-insensitive use-case substring.
    pub use_case: Option<String>,
}

impl SearchQuery {
    pub fn name(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn vendor(vendor: impl Into<String>) -> Self {
        Self {
            vendor: Some(vendor.into()),
            ..Default::default()
        }
    }

    pub fn use_case(use_case: impl Into<String>) -> Self {
        Self {
            use_case: Some(use_case.into()),
            ..Default::default()
        }
    }

    pub fn with_vendor(mut self, vendor: Option<String>) -> Self {
        self.vendor = vendor;
        self
    }

    pub fn with_use_case(mut self, use_case: Option<String>) -> Self {
        self.use_case = use_case;
        self
    }

    /// Whether `entry` satisfies every filter. This is the full-scan predicate.
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        if let Some(text) = non_blank(&self.text)
            && !entry.name.to_lowercase().contains(&text.to_lowercase())
        {
            return false;
        }
        if let Some(vendor) = non_blank(&self.vendor)
            && entry.vendor.to_lowercase() != vendor.to_lowercase()
        {
            return false;
        }
        if let Some(use_case) = non_blank(&self.use_case) {
            let needle = use_case.to_lowercase();
            return entry
                .use_cases
                .iter()
                .any(|uc| uc.to_lowercase().contains(&needle));
        }
        true
    }

    /// Apply the query to a full catalog.
    pub fn filter<'a, I>(&self, entries: I) -> Vec<CatalogEntry>
    where
        I: IntoIterator<Item = &'a CatalogEntry>,
    {
        entries
            .into_iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Longest whitespace-separated token; the first one wins a tie.
fn longest_token(text: &str) -> Option<&str> {
    text.split_whitespace().fold(None, |best, token| match best {
        Some(b) if b.chars().count() >= token.chars().count() => Some(b),
        _ => Some(token),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

/// Which strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTier {
    Direct,
    Narrowed,
    FullScan,
}

impl fmt::Display for SearchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Direct => "remote filter",
            Self::Narrowed => "narrowed remote filter",
            Self::FullScan => "full catalog scan",
        })
    }
}

/// Matches plus how they were found.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub entries: Vec<CatalogEntry>,
    pub tier: SearchTier,
    /// False when a full scan ran over a partially fetched catalog.
    pub complete: bool,
}

impl SearchResult {
    fn remote(entries: Vec<CatalogEntry>, tier: SearchTier) -> Self {
        Self {
            entries,
            tier,
            complete: true,
        }
    }
}

/// One page of actions.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionPage {
    pub entries: Vec<CatalogEntry>,
    pub total: usize,
}

/// Actions grouped under one vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorSummary {
    pub vendor: String,
    pub count: usize,
    pub use_cases: BTreeSet<String>,
    /// False if any of the vendor's actions lacks permission.
    pub has_permission: bool,
}

/// Vendor aggregation over the full catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorListing {
    /// Sorted by vendor name.
    pub vendors: Vec<VendorSummary>,
    pub complete: bool,
}

impl VendorListing {
    /// Actions across all listed vendors.
    pub fn total_actions(&self) -> usize {
        self.vendors.iter().map(|v| v.count).sum()
    }
}

/// Group entries by vendor.
pub fn aggregate_vendors<'a, I>(entries: I) -> Vec<VendorSummary>
where
    I: IntoIterator<Item = &'a CatalogEntry>,
{
    let mut vendors: BTreeMap<String, VendorSummary> = BTreeMap::new();
    for entry in entries {
        let vendor = entry.vendor_or_unknown();
        let summary = vendors
            .entry(vendor.to_string())
            .or_insert_with(|| VendorSummary {
                vendor: vendor.to_string(),
                count: 0,
                use_cases: BTreeSet::new(),
                has_permission: true,
            });
        summary.count += 1;
        summary.use_cases.extend(entry.use_cases.iter().cloned());
        summary.has_permission &= entry.has_permission;
    }
    vendors.into_values().collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

/// Action search over the activities API.
#[derive(Debug, Clone)]
pub struct SearchService {
    activities: ActivitiesApi,
}

impl SearchService {
    pub fn new(activities: ActivitiesApi) -> Self {
        Self { activities }
    }

    /// Dispatch a query to the cheapest strategy that can answer it.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        if let Some(text) = non_blank(&query.text) {
            let mut result = self.search_by_name(text, non_blank(&query.vendor))?;
            if non_blank(&query.use_case).is_some() {
                result.entries.retain(|e| query.matches(e));
            }
            return Ok(result);
        }
        if let Some(use_case) = non_blank(&query.use_case) {
            return self.search_by_use_case(use_case, non_blank(&query.vendor));
        }
        match non_blank(&query.vendor) {
            Some(vendor) => self.search_by_vendor(vendor),
            None => Err(DomainError::InvalidQuery(
                "a name, vendor or use case is required".to_string(),
            )),
        }
    }

    /// Name substring search, optionally restricted to one vendor.
    pub fn search_by_name(&self, text: &str, vendor: Option<&str>) -> Result<SearchResult> {
        let query = SearchQuery::name(text).with_vendor(vendor.map(str::to_string));

        // Tier 1: the full query as a remote filter.
        if let Some(found) = self.remote(&query, text, vendor)
            && !found.is_empty()
        {
            debug!(query = text, count = found.len(), "Direct remote filter matched");
            return Ok(SearchResult::remote(found, SearchTier::Direct));
        }

        // Tier 2: narrow remotely by the longest token, match locally.
        if text.split_whitespace().count() > 1
            && let Some(token) = longest_token(text)
        {
            debug!(query = text, token, "Narrowing remote filter to longest token");
            if let Some(found) = self.remote(&query, token, vendor)
                && !found.is_empty()
            {
                return Ok(SearchResult::remote(found, SearchTier::Narrowed));
            }
        }

        // Tier 3: full scan.
        info!(query = text, "Remote filters found nothing, scanning the full catalog");
        self.full_scan(&query)
    }

    /// Every action of one vendor.
    ///
    /// Falls back to a full scan when the remote filter fails or returns
    /// nothing.
    pub fn search_by_vendor(&self, vendor: &str) -> Result<SearchResult> {
        let query = SearchQuery::vendor(vendor);
        match self.activities.filter(&Fql::new().eq("vendor", vendor)) {
            Ok(found) => {
                let found = query.filter(&found);
                if !found.is_empty() {
                    return Ok(SearchResult::remote(found, SearchTier::Direct));
                }
                debug!(vendor, "Vendor filter returned nothing, scanning the full catalog");
            }
            Err(e) => {
                warn!(vendor, error = %e, "Vendor filter failed, scanning the full catalog");
            }
        }
        self.full_scan(&query)
    }

    /// Actions whose use cases contain `use_case`. Always a full scan.
    pub fn search_by_use_case(&self, use_case: &str, vendor: Option<&str>) -> Result<SearchResult> {
        let query = SearchQuery::use_case(use_case).with_vendor(vendor.map(str::to_string));
        self.full_scan(&query)
    }

    /// Browse the catalog. With a vendor, pages over that vendor's actions.
    pub fn list(&self, limit: usize, offset: usize, vendor: Option<&str>) -> Result<ActionPage> {
        if let Some(vendor) = vendor.filter(|v| !v.trim().is_empty()) {
            let all = self.search_by_vendor(vendor)?.entries;
            let total = all.len();
            let entries = all.into_iter().skip(offset).take(limit).collect();
            return Ok(ActionPage { entries, total });
        }
        let (entries, total) = self.activities.list_page(limit, offset)?;
        Ok(ActionPage { entries, total })
    }

    /// Full details for one action.
    pub fn details(&self, id: &str) -> Result<CatalogEntry> {
        self.activities
            .details(id)?
            .ok_or_else(|| DomainError::NotFound(format!("action '{}'", id)))
    }

    /// Group the full catalog by vendor.
    ///
    /// With `use_case`, only vendors with a use case containing it are kept.
    pub fn list_vendors(&self, use_case: Option<&str>) -> Result<VendorListing> {
        let (entries, complete) = self.catalog()?;
        let mut vendors = aggregate_vendors(&entries);
        if let Some(needle) = use_case.map(str::trim).filter(|u| !u.is_empty()) {
            let needle = needle.to_lowercase();
            vendors.retain(|v| v.use_cases.iter().any(|uc| uc.to_lowercase().contains(&needle)));
        }
        Ok(VendorListing { vendors, complete })
    }

    /// Remove the local catalog cache.
    pub fn clear_cache(&self) -> bool {
        self.activities.clear_cache()
    }

    /// Run a remote filter; `None` when the remote rejected it.
    fn remote(&self, query: &SearchQuery, name: &str, vendor: Option<&str>) -> Option<Vec<CatalogEntry>> {
        let mut fql = Fql::new();
        if let Some(vendor) = vendor {
            fql = fql.eq("vendor", vendor);
        }
        fql = fql.eq("name", name);

        match self.activities.filter(&fql) {
            Ok(candidates) => Some(query.filter(&candidates)),
            Err(e) => {
                warn!(filter = %fql, error = %e, "Remote filter failed");
                None
            }
        }
    }

    fn full_scan(&self, query: &SearchQuery) -> Result<SearchResult> {
        let (entries, complete) = self.catalog()?;
        let found = query.filter(&entries);
        debug!(scanned = entries.len(), count = found.len(), complete, "Full catalog scan");
        Ok(SearchResult {
            entries: found,
            tier: SearchTier::FullScan,
            complete,
        })
    }

    /// The full catalog; fails only when nothing at all could be fetched.
    fn catalog(&self) -> Result<(Vec<CatalogEntry>, bool)> {
        let source = self.activities.load_or_fetch();
        if source.entries.is_empty() && !source.complete {
            return Err(DomainError::CatalogUnavailable);
        }
        if source.from_cache {
            debug!(count = source.entries.len(), "Using cached action catalog");
        }
        Ok((source.entries, source.complete))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{action, activities, catalog_gateway, filter_requests};
    use fusion_client::{InMemoryGateway, RemoteFailure, endpoints};
    use serde_json::json;
    use std::sync::Arc;

    fn service(gateway: &Arc<InMemoryGateway>) -> SearchService {
        SearchService::new(activities(gateway))
    }

    fn names(result: &SearchResult) -> Vec<&str> {
        result.entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_full_scan_scenario() {
        // Remote filter always fails, forcing the full scan.
        let gateway = Arc::new(InMemoryGateway::new());
        let actions = vec![
            action("1", "Contain host", "X"),
            action("2", "Contain device", "X"),
            action("3", "Lift containment", "Z"),
        ];
        gateway.on("GET", endpoints::ACTIVITIES_COMBINED, move |req| {
            if req.param("filter").is_some() {
                return Err(RemoteFailure::permanent("filter not supported"));
            }
            Ok(fusion_client::Envelope::page(actions.clone(), 3))
        });
        let service = service(&gateway);

        let found = service.search_by_name("contain", None).unwrap();
        assert_eq!(found.tier, SearchTier::FullScan);
        assert_eq!(
            names(&found),
            vec!["Contain host", "Contain device", "Lift containment"]
        );

        let vendor_z = service.search_by_name("contain", Some("Z")).unwrap();
        assert_eq!(vendor_z.tier, SearchTier::FullScan);
        assert_eq!(names(&vendor_z), vec!["Lift containment"]);

        let none = service.search_by_name("contain", Some("Y")).unwrap();
        assert!(none.entries.is_empty());
    }

    #[test]
    fn test_direct_filter_wins() {
        let gateway = catalog_gateway(vec![
            action("1", "Contain host", "X"),
            action("2", "Send email", "X"),
        ]);

        let found = service(&gateway).search_by_name("contain", None).unwrap();
        assert_eq!(found.tier, SearchTier::Direct);
        assert_eq!(names(&found), vec!["Contain host"]);
        assert_eq!(filter_requests(&gateway), vec!["name:'contain'"]);
    }

    #[test]
    fn test_multi_word_narrowing() {
        let gateway = catalog_gateway(vec![
            action("1", "Get detection details", "CrowdStrike"),
            action("2", "Update detection", "CrowdStrike"),
            action("3", "Get host details", "CrowdStrike"),
        ]);

        let found = service(&gateway)
            .search_by_name("detection details", None)
            .unwrap();
        assert_eq!(found.tier, SearchTier::Narrowed);
        assert_eq!(names(&found), vec!["Get detection details"]);
        assert_eq!(
            filter_requests(&gateway),
            vec!["name:'detection details'", "name:'detection'"]
        );
    }

    #[test]
    fn test_longest_token_first_on_tie() {
        assert_eq!(longest_token("get host details"), Some("details"));
        assert_eq!(longest_token("abc xyz"), Some("abc"));
        assert_eq!(longest_token("   "), None);
    }

    #[test]
    fn test_narrowed_miss_falls_through_to_full_scan() {
        // Candidates for the longest token exist, but none match the full query.
        let gateway = catalog_gateway(vec![action("1", "Detection summary", "X")]);

        let found = service(&gateway)
            .search_by_name("detection details", None)
            .unwrap();
        assert_eq!(found.tier, SearchTier::FullScan);
        assert!(found.entries.is_empty());
    }

    #[test]
    fn test_vendor_filter_in_remote_query() {
        let gateway = catalog_gateway(vec![
            action("1", "Deactivate user", "Okta"),
            action("2", "Deactivate user", "Entra"),
        ]);

        let found = service(&gateway)
            .search_by_name("deactivate", Some("okta"))
            .unwrap();
        assert_eq!(found.entries.len(), 1);
        assert_eq!(found.entries[0].vendor, "Okta");
        assert_eq!(filter_requests(&gateway), vec!["vendor:'okta'+name:'deactivate'"]);
    }

    #[test]
    fn test_vendor_search_falls_back_on_empty() {
        let gateway = Arc::new(InMemoryGateway::new());
        let actions = vec![action("1", "Deactivate user", "Okta")];
        gateway.on("GET", endpoints::ACTIVITIES_COMBINED, move |req| {
            if req.param("filter").is_some() {
                return Ok(fusion_client::Envelope::page(Vec::new(), 0));
            }
            Ok(fusion_client::Envelope::page(actions.clone(), 1))
        });

        let found = service(&gateway).search_by_vendor("OKTA").unwrap();
        assert_eq!(found.tier, SearchTier::FullScan);
        assert_eq!(found.entries.len(), 1);
    }

    #[test]
    fn test_use_case_always_scans() {
        let gateway = catalog_gateway(vec![
            json!({"id": "1", "name": "Lock account", "vendor": "Okta", "use_cases": ["Identity protection"]}),
            json!({"id": "2", "name": "Isolate", "vendor": "CrowdStrike", "use_cases": ["Endpoint"]}),
        ]);

        let found = service(&gateway).search_by_use_case("identity", None).unwrap();
        assert_eq!(found.tier, SearchTier::FullScan);
        assert_eq!(names(&found), vec!["Lock account"]);
        assert!(filter_requests(&gateway).is_empty());
    }

    #[test]
    fn test_unavailable_catalog_is_an_error() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.on("GET", endpoints::ACTIVITIES_COMBINED, |_| {
            Err(RemoteFailure::permanent("forbidden"))
        });

        let err = service(&gateway).search_by_use_case("x", None).unwrap_err();
        assert!(matches!(err, DomainError::CatalogUnavailable));
    }

    #[test]
    fn test_empty_query_rejected() {
        let gateway = catalog_gateway(Vec::new());
        let err = service(&gateway)
            .search(&SearchQuery::name("   "))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuery(_)));
    }

    #[test]
    fn test_list_vendors_aggregates() {
        let gateway = catalog_gateway(vec![
            json!({"id": "1", "name": "A", "vendor": "Okta", "use_cases": ["Identity"], "has_permission": true}),
            json!({"id": "2", "name": "B", "vendor": "Okta", "use_cases": ["Identity", "Access"], "has_permission": false}),
            json!({"id": "3", "name": "C", "vendor": null, "use_cases": ["Misc"]}),
        ]);

        let listing = service(&gateway).list_vendors(None).unwrap();
        assert!(listing.complete);
        assert_eq!(listing.total_actions(), 3);
        assert_eq!(listing.vendors.len(), 2);

        let okta = &listing.vendors[0];
        assert_eq!(okta.vendor, "Okta");
        assert_eq!(okta.count, 2);
        assert!(!okta.has_permission);
        assert_eq!(okta.use_cases.len(), 2);
        assert_eq!(listing.vendors[1].vendor, "Unknown");

        let narrowed = service(&gateway).list_vendors(Some("access")).unwrap();
        assert_eq!(narrowed.vendors.len(), 1);
    }

    #[test]
    fn test_list_with_vendor_slices_locally() {
        let gateway = catalog_gateway(
            (0..5)
                .map(|i| action(&i.to_string(), &format!("Action {}", i), "Okta"))
                .collect(),
        );

        let page = service(&gateway).list(2, 3, Some("Okta")).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].name, "Action 3");
    }

    #[test]
    fn test_details_not_found() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.on("GET", endpoints::ACTIVITIES_ENTITIES, |_| {
            Ok(fusion_client::Envelope::default())
        });

        let err = service(&gateway).details("nope").unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::testing::{action, activities, catalog_gateway};
    use proptest::prelude::*;

    const WORDS: [&str; 6] = ["contain", "host", "device", "get", "details", "detection"];
    const VENDORS: [&str; 3] = ["CrowdStrike", "Okta", "Zscaler"];

    fn catalog_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
        prop::collection::vec(
            (
                prop::collection::vec(prop::sample::select(WORDS.to_vec()), 1..4),
                prop::sample::select(VENDORS.to_vec()),
            )
                .prop_map(|(words, vendor)| (words.join(" "), vendor.to_string())),
            0..20,
        )
    }

    fn query_strategy() -> impl Strategy<Value = (String, Option<String>)> {
        (
            prop::collection::vec(prop::sample::select(WORDS.to_vec()), 1..3),
            prop::option::of(prop::sample::select(VENDORS.to_vec())),
        )
            .prop_map(|(words, vendor)| (words.join(" "), vendor.map(str::to_string)))
    }

    proptest! {
        /// Property: whichever tier answers, the result equals the full scan.
        #[test]
        fn tiering_never_changes_the_answer(
            catalog in catalog_strategy(),
            (text, vendor) in query_strategy(),
        ) {
            let actions = catalog
                .iter()
                .enumerate()
                .map(|(i, (name, vendor))| action(&format!("id-{}", i), name, vendor))
                .collect::<Vec<_>>();
            let entries: Vec<CatalogEntry> = actions
                .iter()
                .map(|a| serde_json::from_value(a.clone()).unwrap())
                .collect();
            let gateway = catalog_gateway(actions);
            let service = SearchService::new(activities(&gateway));

            let found = service.search_by_name(&text, vendor.as_deref()).unwrap();
            let expected = SearchQuery::name(text.clone()).with_vendor(vendor.clone()).filter(&entries);

            let mut got: Vec<String> = found.entries.iter().map(|e| e.id.clone()).collect();
            let mut want: Vec<String> = expected.iter().map(|e| e.id.clone()).collect();
            got.sort();
            want.sort();
            prop_assert_eq!(got, want);
        }
    }
}
