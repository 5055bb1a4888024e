use serde::Serialize;

use super::{Panel, RenderContext, Section, SectionId};
use crate::{
    data::Dataset,
    format,
    registry::{display_name, metric_pair, MetricPair},
    stats::pearson,
};

const DESCRIPTION: &str = "Compare dois indicadores selecionados entre as UFs. \
O primeiro indicador é mostrado como colunas (eixo esquerdo), e o segundo como uma linha (eixo direito). \
As UFs são ordenadas pelo valor do primeiro indicador (colunas).";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DualAxisPoint {
    pub region: String,
    pub first: f64,
    pub second: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DualAxisChart {
    pub title: String,
    pub pair_label: String,
    /// Bars, left axis.
    pub first_label: String,
    /// Line with points, independent right axis.
    pub second_label: String,
    /// Sorted by `first`, descending.
    pub points: Vec<DualAxisPoint>,
    pub correlation: Option<f64>,
    pub caption: String,
}

/// Rows of `slice` where both metrics of `pair` are present.
pub fn complete_rows(slice: &Dataset, pair: &MetricPair) -> Option<Vec<DualAxisPoint>> {
    let first = slice.numeric(pair.first)?;
    let second = slice.numeric(pair.second)?;
    Some(
        first
            .into_iter()
            .zip(second)
            .enumerate()
            .filter_map(|(row, values)| match values {
                (Some(a), Some(b)) => Some(DualAxisPoint {
                    region: slice.region(row).to_string(),
                    first: a,
                    second: b,
                }),
                _ => None,
            })
            .collect(),
    )
}

pub fn render(ctx: &RenderContext<'_>) -> Section {
    Section::new(SectionId::Bivariate, "Comparativo Bivariado por UF", build(ctx))
        .with_description(DESCRIPTION)
}

fn build(ctx: &RenderContext<'_>) -> Panel {
    let Some(pair) = metric_pair(&ctx.selection.pair) else {
        return Panel::warning(format!(
            "Par de indicadores '{}' não encontrado.",
            ctx.selection.pair
        ));
    };
    for column in [pair.first, pair.second] {
        if !ctx.dataset.has_column(column) {
            return Panel::warning(format!("Coluna '{}' não encontrada nos dados.", column));
        }
    }

    let mut points = ctx
        .current()
        .and_then(|slice| complete_rows(slice, pair))
        .unwrap_or_default();
    if points.is_empty() {
        return Panel::warning(format!(
            "Não há dados completos (sem valores ausentes) para o par selecionado no ano {}.",
            ctx.year_label()
        ));
    }
    points.sort_by(|a, b| b.first.total_cmp(&a.first));

    let xs: Vec<f64> = points.iter().map(|p| p.first).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.second).collect();
    let correlation = pearson(&xs, &ys);

    let first_label = display_name(pair.first);
    let second_label = display_name(pair.second);
    Panel::DualAxis(DualAxisChart {
        title: format!(
            "{} (Colunas) vs. {} (Linha/Pontos) por UF - {}",
            first_label,
            second_label,
            ctx.year_label()
        ),
        pair_label: pair.label.to_string(),
        first_label,
        second_label,
        points,
        correlation,
        caption: format!(
            "Correlação de Pearson para {}: {}",
            ctx.year_label(),
            format::three_decimals(correlation)
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::parse_csv,
        filter::{DashboardEvent, Selection},
        registry::METRIC_PAIRS,
        test_support::{context, sample_dataset},
    };
    use anyhow::Result;

    fn dual(panel: &Panel) -> &DualAxisChart {
        match panel {
            Panel::DualAxis(chart) => chart,
            other => panic!("expected dual axis, got {:?}", other),
        }
    }

    #[test]
    fn test_sorted_by_first_metric_with_correlation() {
        let ds = sample_dataset();
        let sel = Selection::from_events([DashboardEvent::SelectPair(
            "Renda Média vs Desemprego (%)".into(),
        )]);
        let section = render(&context(&ds, None, &sel, 2020));
        let chart = dual(&section.body);
        let order: Vec<_> = chart.points.iter().map(|p| p.region.as_str()).collect();
        assert_eq!(order, vec!["São Paulo", "Acre", "Bahia"]);
        assert_eq!(chart.first_label, "Renda Média Anual");
        assert_eq!(chart.second_label, "Taxa de Desemprego (%)");
        let r = chart.correlation.unwrap();
        assert!((-1.0..=1.0).contains(&r));
        assert!(r < 0.0);
        assert!(chart.caption.starts_with("Correlação de Pearson para 2020: -0."));
    }

    #[test]
    fn test_every_pair_renders_on_sample() {
        let ds = sample_dataset();
        for pair in METRIC_PAIRS.iter() {
            let sel = Selection::from_events([DashboardEvent::SelectPair(pair.label.into())]);
            let section = render(&context(&ds, None, &sel, 2021));
            assert!(matches!(section.body, Panel::DualAxis(_)), "{}", pair.label);
        }
    }

    #[test]
    fn test_rows_missing_either_metric_are_dropped() -> Result<()> {
        let ds = parse_csv(
            "Ano,UF,Populacao_total,renda_media_anual,taxa_desemprego_media\n\
             2020,Acre,100,10,\n\
             2020,Bahia,100,20,5\n"
                .as_bytes(),
        )?
        .dataset;
        let sel = Selection::from_events([DashboardEvent::SelectPair(
            "Renda Média vs Desemprego (%)".into(),
        )]);
        let section = render(&context(&ds, None, &sel, 2020));
        let chart = dual(&section.body);
        assert_eq!(chart.points.len(), 1);
        assert_eq!(chart.correlation, None);
        assert!(chart.caption.ends_with("N/D"));
        Ok(())
    }

    #[test]
    fn test_missing_pair_column_warns() -> Result<()> {
        let ds = parse_csv("Ano,UF,Populacao_total\n2020,Acre,100\n".as_bytes())?.dataset;
        let sel = Selection::default();
        let section = render(&context(&ds, None, &sel, 2020));
        assert!(section.body.is_warning());
        Ok(())
    }

    #[test]
    fn test_empty_year_warns() {
        let ds = sample_dataset();
        let sel = Selection::default();
        let section = render(&context(&ds, None, &sel, 2031));
        assert!(section.body.is_warning());
    }
}
