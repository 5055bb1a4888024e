use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::{Notice, Panel, RenderContext, Section, SectionId};
use crate::{
    data::Dataset,
    filter::RegionChoice,
    registry::{column_for, national_metric, Aggregation},
    stats::{mean, sum},
};

const PROMPT_AT_LEAST_ONE: &str = "Selecione pelo menos uma métrica para visualizar a evolução.";
const NONE_AVAILABLE: &str = "Nenhuma das métricas selecionadas está disponível para a evolução.";

/// One (year, metric, value) row of the long-format reshape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePoint {
    pub year: i64,
    pub metric: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub title: String,
    /// Metric labels, in legend order.
    pub series: Vec<String>,
    pub points: Vec<LinePoint>,
}

impl LineChart {
    pub fn series_points(&self, metric: &str) -> impl Iterator<Item = &LinePoint> {
        let metric = metric.to_string();
        self.points.iter().filter(move |p| p.metric == metric)
    }
}

/// Reshape wide per-year columns into long rows, metric-major like a melt.
pub fn melt(years: &[i64], columns: &[(String, Vec<Option<f64>>)]) -> Vec<LinePoint> {
    columns
        .iter()
        .flat_map(|(label, values)| {
            years.iter().zip(values).map(move |(year, value)| LinePoint {
                year: *year,
                metric: label.clone(),
                value: *value,
            })
        })
        .collect()
}

/// Per-year aggregate of `source` across regions, years ascending.
pub fn aggregate_by_year(
    dataset: &Dataset,
    source: &str,
    aggregation: Aggregation,
) -> Option<(Vec<i64>, Vec<Option<f64>>)> {
    let values = dataset.numeric(source)?;
    let mut groups: BTreeMap<i64, Vec<Option<f64>>> = BTreeMap::new();
    for (row, v) in values.into_iter().enumerate() {
        groups.entry(dataset.year(row)).or_default().push(v);
    }
    let years = groups.keys().copied().collect();
    let aggregated = groups
        .into_values()
        .map(|vs| match aggregation {
            Aggregation::Mean => mean(vs),
            Aggregation::Sum => sum(vs),
        })
        .collect();
    Some((years, aggregated))
}

pub fn render(ctx: &RenderContext<'_>) -> Section {
    let heading = format!("Evolução do Estado: {}", ctx.selection.region.as_str());
    let (body, notices) = match &ctx.selection.region {
        RegionChoice::Region(name) => build_region(ctx, name),
        RegionChoice::All => build_national(ctx),
    };
    Section::new(SectionId::Evolution, heading, body).with_notices(notices)
}

fn finish(title: String, years_and_columns: Vec<(Vec<i64>, String, Vec<Option<f64>>)>) -> Panel {
    if years_and_columns
        .iter()
        .all(|(_, _, values)| values.iter().all(Option::is_none))
    {
        return Panel::warning("Não há dados válidos para as métricas selecionadas.");
    }
    let series = years_and_columns.iter().map(|(_, l, _)| l.clone()).collect();
    let points = years_and_columns
        .into_iter()
        .flat_map(|(years, label, values)| melt(&years, &[(label, values)]))
        .collect();
    Panel::Lines(LineChart {
        title,
        series,
        points,
    })
}

fn build_region(ctx: &RenderContext<'_>, region: &str) -> (Panel, Vec<Notice>) {
    let mut notices = Vec::new();
    let labels = ctx.selection.effective_evolution_metrics();
    if labels.is_empty() {
        return (Panel::prompt(PROMPT_AT_LEAST_ONE), notices);
    }

    let history = match ctx.dataset.for_region(region) {
        Ok(h) if !h.is_empty() => h,
        Ok(_) => {
            return (
                Panel::warning(format!("Não há dados para a UF '{}'.", region)),
                notices,
            )
        }
        Err(e) => {
            debug!("region history unavailable: {:#}", e);
            return (
                Panel::warning(format!("Não foi possível montar o histórico de '{}'.", region)),
                notices,
            );
        }
    };
    let years: Vec<i64> = (0..history.num_rows()).map(|i| history.year(i)).collect();

    let mut columns = Vec::new();
    for label in labels {
        match column_for(&label).and_then(|c| history.numeric(c)) {
            Some(values) => columns.push((years.clone(), label, values)),
            None => notices.push(Notice::warning(format!(
                "Métrica '{}' não encontrada para a evolução.",
                label
            ))),
        }
    }
    if columns.is_empty() {
        return (Panel::warning(NONE_AVAILABLE), notices);
    }

    let title = format!("Evolução de Indicadores para {}", region);
    (finish(title, columns), notices)
}

fn build_national(ctx: &RenderContext<'_>) -> (Panel, Vec<Notice>) {
    let mut notices = Vec::new();
    let labels = ctx.selection.effective_evolution_metrics();
    if labels.is_empty() {
        return (Panel::prompt(PROMPT_AT_LEAST_ONE), notices);
    }

    let mut columns = Vec::new();
    for label in labels {
        let aggregated = national_metric(&label)
            .and_then(|m| aggregate_by_year(ctx.dataset, m.source, m.aggregation));
        match aggregated {
            Some((years, values)) => columns.push((years, label, values)),
            None => notices.push(Notice::warning(format!(
                "Métrica '{}' não disponível para a evolução nacional.",
                label
            ))),
        }
    }
    if columns.is_empty() {
        return (Panel::warning(NONE_AVAILABLE), notices);
    }

    let title = "Evolução de Indicadores Nacionais (Médias/Somas)".to_string();
    (finish(title, columns), notices)
}
