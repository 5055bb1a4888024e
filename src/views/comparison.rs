use serde::Serialize;

use super::{Notice, Panel, RenderContext, Section, SectionId};
use crate::{
    filter::RankOrder,
    registry::column_for,
    stats::{nlargest, nsmallest},
};

pub const MIN_METRICS: usize = 2;
pub const MAX_METRICS: usize = 3;
pub const COMPARISON_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedBar {
    pub region: String,
    pub metric: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedBarChart {
    pub title: String,
    pub subtitle: String,
    pub sort_metric: String,
    pub order: RankOrder,
    /// Category order of the x axis.
    pub regions: Vec<String>,
    pub metrics: Vec<String>,
    pub bars: Vec<GroupedBar>,
}

pub fn render(ctx: &RenderContext<'_>) -> Section {
    let description = format!(
        "Compare diferentes métricas lado a lado para os estados no ano de {}.",
        ctx.year_label()
    );
    let (body, notices) = build(ctx);
    Section::new(
        SectionId::Comparison,
        "Comparativo de Indicadores por UF",
        body,
    )
    .with_description(description)
    .with_notices(notices)
}

/// Selected labels, deduplicated in order, that map to a column present in
/// the data. Every other label yields a notice.
fn resolve_columns(ctx: &RenderContext<'_>) -> (Vec<(String, &'static str)>, Vec<Notice>) {
    let mut columns: Vec<(String, &'static str)> = Vec::new();
    let mut notices = Vec::new();
    for label in &ctx.selection.comparison_metrics {
        if columns.iter().any(|(l, _)| l == label) {
            continue;
        }
        match column_for(label).filter(|c| ctx.dataset.has_column(c)) {
            Some(c) => columns.push((label.clone(), c)),
            None => notices.push(Notice::warning(format!(
                "Métrica '{}' não encontrada para comparação.",
                label
            ))),
        }
    }
    (columns, notices)
}

fn build(ctx: &RenderContext<'_>) -> (Panel, Vec<Notice>) {
    let (columns, notices) = resolve_columns(ctx);
    if columns.len() < MIN_METRICS {
        return (
            Panel::prompt("Selecione pelo menos duas métricas para comparação."),
            notices,
        );
    }
    if columns.len() > MAX_METRICS {
        return (
            Panel::prompt("Selecione no máximo três métricas para comparação."),
            notices,
        );
    }
    (chart(ctx, &columns), notices)
}

fn chart(ctx: &RenderContext<'_>, columns: &[(String, &'static str)]) -> Panel {
    let sort_label = ctx
        .selection
        .resolve_comparison_sort()
        .filter(|s| columns.iter().any(|(l, _)| l == s))
        .unwrap_or(columns[0].0.as_str());
    let no_data = || {
        Panel::warning(format!(
            "Não há dados suficientes ou válidos para a métrica '{}' em {} para gerar o gráfico.",
            sort_label,
            ctx.year_label()
        ))
    };
    let Some(slice) = ctx.current() else {
        return no_data();
    };

    let values: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|(_, c)| slice.numeric(c).unwrap_or_default())
        .collect();
    let Some(sort_idx) = columns.iter().position(|(l, _)| l == sort_label) else {
        return no_data();
    };

    // (row, sort value) for rows where the sort metric is present
    let candidates: Vec<(usize, f64)> = values[sort_idx]
        .iter()
        .enumerate()
        .filter_map(|(row, v)| v.map(|v| (row, v)))
        .collect();
    if candidates.is_empty() {
        return no_data();
    }

    let order = ctx.selection.comparison_order;
    let picked = match order {
        RankOrder::Top => nlargest(&candidates, COMPARISON_SIZE, |c| c.1),
        RankOrder::Bottom => nsmallest(&candidates, COMPARISON_SIZE, |c| c.1),
    };
    let regions: Vec<String> = picked
        .iter()
        .map(|(row, _)| slice.region(*row).to_string())
        .collect();

    let bars = columns
        .iter()
        .zip(&values)
        .flat_map(|((label, _), vals)| {
            picked.iter().map(move |(row, _)| GroupedBar {
                region: slice.region(*row).to_string(),
                metric: label.clone(),
                value: vals[*row],
            })
        })
        .collect();

    let metrics: Vec<String> = columns.iter().map(|(l, _)| l.clone()).collect();
    Panel::GroupedBars(GroupedBarChart {
        title: format!("Comparativo: {}", metrics.join(", ")),
        subtitle: format!("{} UFs por '{}'", order.label(), sort_label),
        sort_metric: sort_label.to_string(),
        order,
        regions,
        metrics,
        bars,
    })
}
