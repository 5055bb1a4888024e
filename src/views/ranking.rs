use serde::Serialize;

use super::{Panel, RenderContext, Section, SectionId};
use crate::{
    data::Dataset,
    registry::column_for,
    stats::{nlargest, nsmallest},
};

pub const RANKING_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub region: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingChart {
    pub metric_label: String,
    /// Largest first.
    pub top: Vec<Bar>,
    /// Smallest first.
    pub bottom: Vec<Bar>,
}

/// `(region, value)` for every row of `slice` with a numeric `column`.
pub fn valid_values(slice: &Dataset, column: &str) -> Vec<Bar> {
    slice
        .numeric(column)
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(row, v)| {
            v.map(|value| Bar {
                region: slice.region(row).to_string(),
                value,
            })
        })
        .collect()
}

pub fn render(ctx: &RenderContext<'_>) -> Section {
    let heading = format!("Ranking dos Estados - {}", ctx.year_label());
    let label = ctx.selection.ranking_metric.as_str();

    let Some(column) = column_for(label).filter(|c| ctx.dataset.has_column(c)) else {
        return Section::new(
            SectionId::Ranking,
            heading,
            Panel::warning(format!("Métrica '{}' não encontrada para o ranking.", label)),
        );
    };

    let bars = ctx
        .current()
        .map(|slice| valid_values(slice, column))
        .unwrap_or_default();
    if bars.is_empty() {
        return Section::new(
            SectionId::Ranking,
            heading,
            Panel::warning(format!(
                "Não há dados válidos para '{}' em {} para o ranking.",
                label,
                ctx.year_label()
            )),
        );
    }

    let chart = RankingChart {
        metric_label: label.to_string(),
        top: nlargest(&bars, RANKING_SIZE, |b| b.value),
        bottom: nsmallest(&bars, RANKING_SIZE, |b| b.value),
    };
    Section::new(SectionId::Ranking, heading, Panel::Ranking(chart))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::parse_csv,
        filter::{DashboardEvent, Selection},
        test_support::{context, sample_dataset},
    };
    use anyhow::Result;
    use std::fmt::Write;

    #[test]
    fn test_ranking_orders_each_side() {
        let ds = sample_dataset();
        let sel = Selection::from_events([DashboardEvent::SelectRankingMetric(
            "Renda Média Anual".into(),
        )]);
        let section = render(&context(&ds, None, &sel, 2020));
        let Panel::Ranking(chart) = &section.body else {
            panic!("expected a ranking");
        };
        let top: Vec<_> = chart.top.iter().map(|b| b.region.as_str()).collect();
        let bottom: Vec<_> = chart.bottom.iter().map(|b| b.region.as_str()).collect();
        assert_eq!(top, vec!["São Paulo", "Acre", "Bahia"]);
        assert_eq!(bottom, vec!["Bahia", "Acre", "São Paulo"]);
    }

    #[test]
    fn test_top_and_bottom_disjoint_with_27_regions() -> Result<()> {
        let mut csv = String::from("Ano,UF,Populacao_total,taxa_desemprego_media\n");
        for i in 0..27 {
            writeln!(csv, "2020,UF{:02},1000,{}", i, (i * 11) % 27)?;
        }
        let ds = parse_csv(csv.as_bytes())?.dataset;
        let sel = Selection::default();
        let section = render(&context(&ds, None, &sel, 2020));
        let Panel::Ranking(chart) = &section.body else {
            panic!("expected a ranking");
        };
        assert_eq!(chart.top.len(), 10);
        assert_eq!(chart.bottom.len(), 10);
        assert!(chart
            .top
            .iter()
            .all(|t| chart.bottom.iter().all(|b| b.region != t.region)));
        assert!(chart.top[9].value >= chart.bottom[9].value);
        Ok(())
    }

    #[test]
    fn test_empty_year_warns() {
        let ds = sample_dataset();
        let sel = Selection::default();
        let section = render(&context(&ds, None, &sel, 2030));
        assert!(section.body.is_warning());
    }
}
