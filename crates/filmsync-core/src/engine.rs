//! One-to-one assignment of catalog items to inventory items.
//!
//! Catalog items are processed in rank order. Each scans the pool of
//! still-unassigned inventory items; an accepted match removes exactly that
//! item, so the pool only ever shrinks.

use crate::classify::{Evaluation, Prepared, evaluate, settle};
use crate::filter::{Screening, screen};
use crate::{
    CatalogItem, InventoryItem, MatchConfig, MatchEvent, MatchReason, MatchResult, MatchTier,
};

/// Inventory items not yet bound to a catalog item, in scan order.
#[derive(Debug, Default)]
pub struct InventoryPool {
    entries: Vec<(InventoryItem, Prepared)>,
}

impl InventoryPool {
    pub fn new(items: Vec<InventoryItem>) -> Self {
        let entries = items
            .into_iter()
            .map(|item| {
                let prepared = Prepared::new(&item.title, &item.year);
                (item, prepared)
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&InventoryItem> {
        self.entries.get(slot).map(|(item, _)| item)
    }

    /// Take an item out of the pool. Remaining items keep their order.
    fn take(&mut self, slot: usize) -> InventoryItem {
        self.entries.remove(slot).0
    }

    pub fn into_items(self) -> Vec<InventoryItem> {
        self.entries.into_iter().map(|(item, _)| item).collect()
    }
}

/// Output of a run: one result per catalog item plus the unassigned pool.
#[derive(Debug)]
pub struct Reconciliation {
    pub results: Vec<MatchResult>,
    pub remaining: Vec<InventoryItem>,
}

impl Reconciliation {
    /// Handles of accepted matches, in rank order.
    pub fn accepted_handles(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.is_accepted())
            .filter_map(|r| r.matched_handle.as_deref())
            .collect()
    }
}

/// Best candidate retained so far during a scan.
#[derive(Debug)]
struct Tentative {
    slot: usize,
    ratio: f64,
    year_deviation: u32,
    diagnosis: Option<MatchReason>,
}

/// How the scan of the pool for one catalog item ended.
#[derive(Debug)]
enum ScanOutcome {
    /// Rules 1-3 fired; scanning stopped at `slot`.
    Exact {
        slot: usize,
        ratio: f64,
        year_deviation: u32,
        reasons: Vec<MatchReason>,
    },
    Fuzzy(Tentative),
    Nothing,
}

/// Runs the matching rules over a catalog and an inventory.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: MatchConfig,
}

impl Reconciler {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn run(&self, catalog: &[CatalogItem], inventory: Vec<InventoryItem>) -> Reconciliation {
        self.run_with_progress(catalog, inventory, |_| {})
    }

    /// Like [`run`](Self::run), reporting each catalog item through `progress`.
    pub fn run_with_progress(
        &self,
        catalog: &[CatalogItem],
        inventory: Vec<InventoryItem>,
        progress: impl FnMut(MatchEvent),
    ) -> Reconciliation {
        let Some(done) = self.run_until(catalog, inventory, progress, || false) else {
            unreachable!("run without a stop condition ended early");
        };
        done
    }

    /// Like [`run_with_progress`](Self::run_with_progress), checking `stop`
    /// before each catalog item. Returns `None` if it asked to stop; no
    /// partial result is produced.
    pub fn run_until(
        &self,
        catalog: &[CatalogItem],
        inventory: Vec<InventoryItem>,
        mut progress: impl FnMut(MatchEvent),
        stop: impl Fn() -> bool,
    ) -> Option<Reconciliation> {
        let mut order: Vec<&CatalogItem> = catalog.iter().collect();
        order.sort_by_key(|item| item.rank);

        let mut pool = InventoryPool::new(inventory);
        let total = order.len();
        let mut results = Vec::with_capacity(total);

        for (index, item) in order.into_iter().enumerate() {
            if stop() {
                tracing::info!(decided = index, total, "reconciliation stopped");
                return None;
            }
            progress(MatchEvent::Scanning {
                index,
                total,
                title: item.title.clone(),
                pool_size: pool.len(),
            });

            let result = self.assign(item, &mut pool);
            tracing::debug!(
                rank = item.rank,
                title = %item.title,
                tier = %result.tier,
                ratio = result.similarity_ratio,
                reason = %result.diagnostic(),
                "catalog item decided"
            );

            progress(MatchEvent::Decided {
                index,
                total,
                result: Box::new(result.clone()),
            });
            results.push(result);
        }

        Some(Reconciliation {
            results,
            remaining: pool.into_items(),
        })
    }

    /// Decide one catalog item, removing its match from the pool on acceptance.
    fn assign(&self, item: &CatalogItem, pool: &mut InventoryPool) -> MatchResult {
        let target = Prepared::new(&item.title, item.year.as_deref().unwrap_or_default());

        match self.scan(item, &target, pool) {
            ScanOutcome::Exact {
                slot,
                ratio,
                year_deviation,
                reasons,
            } => {
                let matched = pool.take(slot);
                MatchResult {
                    catalog_item: item.clone(),
                    matched_handle: Some(matched.handle.clone()),
                    candidate: Some(matched),
                    similarity_ratio: ratio,
                    year_deviation,
                    tier: MatchTier::Exact,
                    reasons,
                }
            }
            ScanOutcome::Fuzzy(best) => {
                let tier = settle(best.diagnosis);
                let (matched_handle, candidate) = if tier.is_accepted() {
                    let matched = pool.take(best.slot);
                    (Some(matched.handle.clone()), Some(matched))
                } else {
                    (None, pool.get(best.slot).cloned())
                };
                MatchResult {
                    catalog_item: item.clone(),
                    matched_handle,
                    candidate,
                    similarity_ratio: best.ratio,
                    year_deviation: best.year_deviation,
                    tier,
                    reasons: vec![best.diagnosis.unwrap_or(MatchReason::UndiagnosedFuzzy)],
                }
            }
            ScanOutcome::Nothing => MatchResult::not_found(item.clone()),
        }
    }

    /// Walk the pool once, returning early when an exact rule fires.
    ///
    /// Fuzzy candidates replace the retained one only with a strictly higher
    /// ratio, so ties favour the earliest-scanned candidate.
    fn scan(&self, item: &CatalogItem, target: &Prepared, pool: &InventoryPool) -> ScanOutcome {
        let mut best: Option<Tentative> = None;

        for (slot, (candidate, prepared)) in pool.entries.iter().enumerate() {
            let year_deviation = match screen(
                &target.normalized,
                target.year,
                &prepared.normalized,
                prepared.year,
                &self.config,
            ) {
                Screening::Pass { year_deviation } => year_deviation,
                Screening::Unparsable => {
                    tracing::debug!(
                        catalog = %item.title,
                        catalog_year = ?item.year,
                        candidate = %candidate.title,
                        candidate_year = %candidate.year,
                        "skipping pair: year is not an integer"
                    );
                    continue;
                }
                Screening::Reject(why) => {
                    tracing::trace!(catalog = %item.title, candidate = %candidate.title, ?why, "candidate rejected");
                    continue;
                }
            };

            match evaluate(target, prepared, year_deviation, &self.config) {
                Evaluation::Exact { ratio, reasons } => {
                    return ScanOutcome::Exact {
                        slot,
                        ratio,
                        year_deviation,
                        reasons,
                    };
                }
                Evaluation::Fuzzy { ratio, diagnosis }
                    if best.as_ref().is_none_or(|b| ratio > b.ratio) =>
                {
                    best = Some(Tentative {
                        slot,
                        ratio,
                        year_deviation,
                        diagnosis,
                    });
                }
                Evaluation::Fuzzy { .. } | Evaluation::Below { .. } => {}
            }
        }

        best.map_or(ScanOutcome::Nothing, ScanOutcome::Fuzzy)
    }
}

/// Reconcile a catalog against an inventory with the default configuration.
pub fn reconcile(catalog: &[CatalogItem], inventory: Vec<InventoryItem>) -> Reconciliation {
    Reconciler::default().run(catalog, inventory)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(rank: u32, title: &str, year: &str) -> CatalogItem {
        CatalogItem {
            rank,
            title: title.to_string(),
            original_title: None,
            year: Some(year.to_string()),
        }
    }

    fn inv(handle: &str, title: &str, year: &str) -> InventoryItem {
        InventoryItem {
            handle: handle.to_string(),
            title: title.to_string(),
            year: year.to_string(),
        }
    }

    #[test]
    fn exact_match_empties_pool() {
        let run = reconcile(
            &[cat(1, "阿甘正传", "1994")],
            vec![inv("h1", "阿甘正传", "1994")],
        );
        assert_eq!(run.results.len(), 1);
        let r = &run.results[0];
        assert_eq!(r.tier, MatchTier::Exact);
        assert_eq!(r.reasons, vec![MatchReason::PreciseMatch]);
        assert_eq!(r.matched_handle.as_deref(), Some("h1"));
        assert_eq!(r.similarity_ratio, 1.0);
        assert!(run.remaining.is_empty());
    }

    #[test]
    fn sequel_with_two_year_gap_is_not_assigned() {
        let run = reconcile(
            &[cat(1, "教父", "1972")],
            vec![inv("h2", "教父2", "1974")],
        );
        let r = &run.results[0];
        assert_eq!(r.tier, MatchTier::FuzzyRejected);
        assert_eq!(r.year_deviation, 2);
        assert_eq!(r.matched_handle, None);
        assert_eq!(r.candidate.as_ref().map(|c| c.handle.as_str()), Some("h2"));
        assert_eq!(run.remaining.len(), 1);
    }

    #[test]
    fn tied_undiagnosed_candidates_stay_in_pool() {
        let run = reconcile(
            &[cat(1, "教父", "1972"), cat(2, "教父3", "1974")],
            vec![inv("h2", "教父2", "1974"), inv("h3", "教父3", "1974")],
        );
        let first = &run.results[0];
        assert_eq!(first.tier, MatchTier::FuzzyRejected);
        // earliest-scanned wins the tie
        assert_eq!(
            first.candidate.as_ref().map(|c| c.handle.as_str()),
            Some("h2")
        );

        // the later catalog item can still claim one of them
        let second = &run.results[1];
        assert_eq!(second.tier, MatchTier::Exact);
        assert_eq!(second.matched_handle.as_deref(), Some("h3"));
        assert_eq!(run.remaining, vec![inv("h2", "教父2", "1974")]);
    }

    #[test]
    fn script_variant_is_exact() {
        let run = reconcile(
            &[cat(1, "霸王别姬", "1993")],
            vec![inv("h", "霸王別姬", "1993")],
        );
        let r = &run.results[0];
        assert_eq!(r.tier, MatchTier::Exact);
        assert_eq!(r.reasons, vec![MatchReason::ScriptVariant]);
        assert!(run.remaining.is_empty());
    }

    #[test]
    fn shared_pinyin_initials_do_not_bind() {
        let run = reconcile(&[cat(1, "教父", "1972")], vec![inv("h", "解放", "1972")]);
        let r = &run.results[0];
        assert_eq!(r.tier, MatchTier::FuzzyRejected);
        assert_eq!(r.matched_handle, None);
        assert_eq!(run.remaining.len(), 1);
    }

    #[test]
    fn diagnosed_fuzzy_is_accepted() {
        let run = reconcile(
            &[cat(1, "霸王别姬", "1993")],
            vec![inv("h", "霸王别姬", "1992")],
        );
        let r = &run.results[0];
        assert_eq!(r.tier, MatchTier::FuzzyAccepted);
        assert_eq!(r.reasons, vec![MatchReason::ReleaseYearDiffers]);
        assert_eq!(r.matched_handle.as_deref(), Some("h"));
        assert_eq!(r.year_deviation, 1);
    }

    #[test]
    fn missing_year_never_matches() {
        let mut item = cat(1, "阿甘正传", "1994");
        item.year = None;
        let run = reconcile(&[item], vec![inv("h1", "阿甘正传", "1994")]);
        assert_eq!(run.results[0].tier, MatchTier::None);
        assert_eq!(run.results[0].reasons, vec![MatchReason::NotFound]);
        assert_eq!(run.remaining.len(), 1);
    }

    #[test]
    fn exact_short_circuits_over_earlier_fuzzy() {
        let run = reconcile(
            &[cat(1, "霸王别姬", "1993")],
            vec![inv("fuzzy", "霸王别姬", "1992"), inv("exact", "霸王别姬", "1993")],
        );
        assert_eq!(run.results[0].matched_handle.as_deref(), Some("exact"));
        assert_eq!(run.remaining.len(), 1);
        assert_eq!(run.remaining[0].handle, "fuzzy");
    }

    #[test]
    fn higher_fuzzy_replaces_lower() {
        // the script variant one year off differs in two characters, the
        // same-script title in one
        let run = reconcile(
            &[cat(1, "霸王别姬", "1993")],
            vec![inv("far", "霸王別姬", "1994"), inv("near", "霸王别姬", "1992")],
        );
        let r = &run.results[0];
        assert_eq!(r.tier, MatchTier::FuzzyAccepted);
        assert_eq!(r.matched_handle.as_deref(), Some("near"));
    }

    #[test]
    fn results_follow_rank_order() {
        let run = reconcile(
            &[cat(3, "c", "2000"), cat(1, "a", "2000"), cat(2, "b", "2000")],
            vec![],
        );
        let ranks: Vec<u32> = run.results.iter().map(|r| r.catalog_item.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn run_until_stops_between_items() {
        let decided = std::cell::Cell::new(0);
        let outcome = Reconciler::default().run_until(
            &[cat(1, "阿甘正传", "1994"), cat(2, "无间道", "2002")],
            vec![inv("h1", "阿甘正传", "1994")],
            |e| {
                if matches!(e, MatchEvent::Decided { .. }) {
                    decided.set(decided.get() + 1);
                }
            },
            || decided.get() >= 1,
        );
        assert!(outcome.is_none());
        assert_eq!(decided.get(), 1);
    }

    #[test]
    fn run_until_without_stop_matches_run() {
        let catalog = [cat(1, "阿甘正传", "1994")];
        let inventory = vec![inv("h1", "阿甘正传", "1994")];
        let full = Reconciler::default()
            .run_until(&catalog, inventory.clone(), |_| {}, || false)
            .unwrap();
        assert_eq!(full.results, reconcile(&catalog, inventory).results);
    }

    #[test]
    fn progress_events_bracket_each_item() {
        let mut events = Vec::new();
        Reconciler::default().run_with_progress(
            &[cat(1, "阿甘正传", "1994"), cat(2, "无间道", "2002")],
            vec![inv("h1", "阿甘正传", "1994")],
            |e| events.push(e),
        );
        assert_eq!(events.len(), 4);
        assert!(matches!(
            events[0],
            MatchEvent::Scanning { index: 0, total: 2, pool_size: 1, .. }
        ));
        assert!(matches!(
            events[2],
            MatchEvent::Scanning { index: 1, pool_size: 0, .. }
        ));
        match &events[3] {
            MatchEvent::Decided { result, .. } => assert_eq!(result.tier, MatchTier::None),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn accepted_handles_in_rank_order() {
        let run = reconcile(
            &[cat(2, "无间道", "2002"), cat(1, "阿甘正传", "1994")],
            vec![inv("a", "无间道", "2002"), inv("b", "阿甘正传", "1994")],
        );
        assert_eq!(run.accepted_handles(), vec!["b", "a"]);
    }
}
