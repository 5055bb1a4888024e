// src/filter.rs
use serde::{Deserialize, Serialize};

use crate::registry::{METRICS, METRIC_PAIRS, NATIONAL_METRICS};

/// Region choice meaning "aggregate over every region".
pub const AGGREGATE_REGION: &str = "Brasil";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum RegionChoice {
    #[default]
    All,
    Region(String),
}

impl RegionChoice {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s == AGGREGATE_REGION {
            RegionChoice::All
        } else {
            RegionChoice::Region(s.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RegionChoice::All => AGGREGATE_REGION,
            RegionChoice::Region(name) => name,
        }
    }
}

/// Which end of a ranking to show.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RankOrder {
    #[default]
    Top,
    Bottom,
}

impl RankOrder {
    pub fn as_str(&self) -> &str {
        match self {
            RankOrder::Top => "top",
            RankOrder::Bottom => "bottom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "top" => Some(RankOrder::Top),
            "bottom" => Some(RankOrder::Bottom),
            _ => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            RankOrder::Top => "Top 10 (Maiores)",
            RankOrder::Bottom => "Bottom 10 (Menores)",
        }
    }
}

/// Everything the user has picked. Views read it, never write it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    /// `None` means the most recent year in the dataset.
    pub year: Option<i64>,
    pub region: RegionChoice,
    pub map_metric: String,
    pub ranking_metric: String,
    /// `None` means the first two metrics applicable to the chosen region.
    pub evolution_metrics: Option<Vec<String>>,
    pub comparison_metrics: Vec<String>,
    /// `None` (or a label not among `comparison_metrics`) sorts by the first one.
    pub comparison_sort: Option<String>,
    pub comparison_order: RankOrder,
    pub pair: String,
    pub show_table: bool,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            year: None,
            region: RegionChoice::All,
            map_metric: METRICS[0].label.to_string(),
            ranking_metric: METRICS[0].label.to_string(),
            evolution_metrics: None,
            comparison_metrics: METRICS[..3].iter().map(|m| m.label.to_string()).collect(),
            comparison_sort: None,
            comparison_order: RankOrder::Top,
            pair: METRIC_PAIRS[0].label.to_string(),
            show_table: false,
        }
    }
}

/// A single filter-change interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    SelectYear(i64),
    SelectRegion(RegionChoice),
    SelectMapMetric(String),
    SelectRankingMetric(String),
    SelectEvolutionMetrics(Vec<String>),
    SelectComparisonMetrics(Vec<String>),
    SelectComparisonSort(String),
    SelectComparisonOrder(RankOrder),
    SelectPair(String),
    ToggleTable(bool),
}

impl Selection {
    pub fn apply(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::SelectYear(y) => self.year = Some(y),
            DashboardEvent::SelectRegion(r) => self.region = r,
            DashboardEvent::SelectMapMetric(m) => self.map_metric = m,
            DashboardEvent::SelectRankingMetric(m) => self.ranking_metric = m,
            DashboardEvent::SelectEvolutionMetrics(ms) => self.evolution_metrics = Some(ms),
            DashboardEvent::SelectComparisonMetrics(ms) => self.comparison_metrics = ms,
            DashboardEvent::SelectComparisonSort(m) => self.comparison_sort = Some(m),
            DashboardEvent::SelectComparisonOrder(o) => self.comparison_order = o,
            DashboardEvent::SelectPair(p) => self.pair = p,
            DashboardEvent::ToggleTable(on) => self.show_table = on,
        }
    }

    /// The default selection with `events` applied in order.
    pub fn from_events(events: impl IntoIterator<Item = DashboardEvent>) -> Self {
        let mut selection = Self::default();
        for event in events {
            selection.apply(event);
        }
        selection
    }

    /// The selected year, or the first of `available` (most recent first).
    pub fn resolve_year(&self, available: &[i64]) -> Option<i64> {
        self.year.or_else(|| available.first().copied())
    }

    /// Evolution metric labels, falling back to the first two applicable to
    /// the chosen region.
    pub fn effective_evolution_metrics(&self) -> Vec<String> {
        if let Some(labels) = &self.evolution_metrics {
            return labels.clone();
        }
        let defaults = match self.region {
            RegionChoice::All => NATIONAL_METRICS[..2].iter().map(|m| m.label).collect::<Vec<_>>(),
            RegionChoice::Region(_) => METRICS[..2].iter().map(|m| m.label).collect(),
        };
        defaults.into_iter().map(str::to_string).collect()
    }

    /// The comparison sort label, constrained to the selected metrics.
    pub fn resolve_comparison_sort(&self) -> Option<&str> {
        self.comparison_sort
            .as_deref()
            .filter(|s| self.comparison_metrics.iter().any(|m| m == s))
            .or_else(|| self.comparison_metrics.first().map(String::as_str))
    }
}

/// Query-string form of a selection. Every present key becomes one event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub year: Option<i64>,
    pub region: Option<String>,
    pub map_metric: Option<String>,
    pub ranking_metric: Option<String>,
    /// Comma-separated labels.
    pub evolution_metrics: Option<String>,
    /// Comma-separated labels.
    pub comparison_metrics: Option<String>,
    pub comparison_sort: Option<String>,
    pub comparison_order: Option<String>,
    pub pair: Option<String>,
    pub show_table: Option<bool>,
}

/// Split a comma-separated label list, dropping blanks.
pub fn split_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl DashboardQuery {
    pub fn events(&self) -> Vec<DashboardEvent> {
        let mut events = Vec::new();
        if let Some(y) = self.year {
            events.push(DashboardEvent::SelectYear(y));
        }
        if let Some(r) = &self.region {
            events.push(DashboardEvent::SelectRegion(RegionChoice::parse(r)));
        }
        if let Some(m) = &self.map_metric {
            events.push(DashboardEvent::SelectMapMetric(m.clone()));
        }
        if let Some(m) = &self.ranking_metric {
            events.push(DashboardEvent::SelectRankingMetric(m.clone()));
        }
        if let Some(ms) = &self.evolution_metrics {
            events.push(DashboardEvent::SelectEvolutionMetrics(split_labels(ms)));
        }
        if let Some(ms) = &self.comparison_metrics {
            events.push(DashboardEvent::SelectComparisonMetrics(split_labels(ms)));
        }
        if let Some(m) = &self.comparison_sort {
            events.push(DashboardEvent::SelectComparisonSort(m.clone()));
        }
        if let Some(o) = self.comparison_order.as_deref().and_then(RankOrder::from_str) {
            events.push(DashboardEvent::SelectComparisonOrder(o));
        }
        if let Some(p) = &self.pair {
            events.push(DashboardEvent::SelectPair(p.clone()));
        }
        if let Some(on) = self.show_table {
            events.push(DashboardEvent::ToggleTable(on));
        }
        events
    }

    pub fn selection(&self) -> Selection {
        Selection::from_events(self.events())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evolution_defaults_follow_region() {
        let national = Selection::default().effective_evolution_metrics();
        assert_eq!(national, vec!["Taxa de Desemprego (%)", "Renda Média Anual"]);
        let regional = Selection::from_events([DashboardEvent::SelectRegion(
            RegionChoice::Region("Acre".into()),
        )])
        .effective_evolution_metrics();
        assert_eq!(regional, vec!["Taxa de Desemprego (%)", "Renda Média Anual"]);
        let explicit = Selection::from_events([DashboardEvent::SelectEvolutionMetrics(vec![])]);
        assert!(explicit.effective_evolution_metrics().is_empty());
    }

    #[test]
    fn test_defaults() {
        let s = Selection::default();
        assert_eq!(s.region, RegionChoice::All);
        assert_eq!(s.map_metric, "Taxa de Desemprego (%)");
        assert_eq!(s.comparison_metrics.len(), 3);
        assert_eq!(s.resolve_comparison_sort(), Some("Taxa de Desemprego (%)"));
        assert!(!s.show_table);
        assert_eq!(s.resolve_year(&[2021, 2020]), Some(2021));
        assert_eq!(s.resolve_year(&[]), None);
    }

    #[test]
    fn test_events_apply_in_order() {
        let s = Selection::from_events([
            DashboardEvent::SelectYear(2019),
            DashboardEvent::SelectRegion(RegionChoice::parse("Acre")),
            DashboardEvent::SelectYear(2020),
            DashboardEvent::ToggleTable(true),
        ]);
        assert_eq!(s.year, Some(2020));
        assert_eq!(s.region, RegionChoice::Region("Acre".into()));
        assert!(s.show_table);
    }

    #[test]
    fn test_region_parse() {
        assert_eq!(RegionChoice::parse("Brasil"), RegionChoice::All);
        assert_eq!(RegionChoice::parse("  "), RegionChoice::All);
        assert_eq!(RegionChoice::parse(" Bahia ").as_str(), "Bahia");
    }

    #[test]
    fn test_sort_falls_back_to_first_selected() {
        let s = Selection::from_events([
            DashboardEvent::SelectComparisonMetrics(vec!["A".into(), "B".into()]),
            DashboardEvent::SelectComparisonSort("C".into()),
        ]);
        assert_eq!(s.resolve_comparison_sort(), Some("A"));
    }

    #[test]
    fn test_query_to_events() {
        let q = DashboardQuery {
            year: Some(2020),
            evolution_metrics: Some("Renda Média Anual, ,População Total".into()),
            comparison_order: Some("BOTTOM".into()),
            ..Default::default()
        };
        let s = q.selection();
        assert_eq!(s.year, Some(2020));
        assert_eq!(
            s.evolution_metrics,
            Some(vec!["Renda Média Anual".into(), "População Total".into()])
        );
        assert_eq!(s.comparison_order, RankOrder::Bottom);
    }

    #[test]
    fn test_empty_evolution_query_is_an_empty_selection() {
        let q = DashboardQuery {
            evolution_metrics: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(q.selection().evolution_metrics, Some(vec![]));
    }
}
