use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

use super::{Notice, Panel, RenderContext, Section, SectionId};
use crate::registry::{column_for, region_code, short_label};

pub const MAP_CENTER: [f64; 2] = [-14.2350, -51.9253];
pub const MAP_ZOOM: f64 = 3.0;
pub const MAP_OPACITY: f64 = 0.7;
pub const COLOR_SCALE: &str = "Blues";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapArea {
    pub region: String,
    pub code: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapChart {
    pub title: String,
    pub metric_label: String,
    pub legend_title: String,
    pub color_scale: &'static str,
    pub min: f64,
    pub max: f64,
    /// `[lat, lon]`
    pub center: [f64; 2],
    pub zoom: f64,
    pub opacity: f64,
    pub areas: Vec<MapArea>,
}

pub fn render(ctx: &RenderContext<'_>) -> Section {
    let heading = format!("Mapa do Brasil - {}", ctx.year_label());
    let label = ctx.selection.map_metric.as_str();
    let (body, notices) = build(ctx, label);
    Section::new(SectionId::Map, heading, body).with_notices(notices)
}

fn build(ctx: &RenderContext<'_>, label: &str) -> (Panel, Vec<Notice>) {
    let mut notices = Vec::new();

    if ctx.geometry.is_none() {
        return (
            Panel::warning("Não é possível exibir o mapa sem o arquivo GeoJSON."),
            notices,
        );
    }
    let Some(column) = column_for(label).filter(|c| ctx.dataset.has_column(c)) else {
        return (
            Panel::warning(format!("Métrica '{}' não encontrada para o mapa.", label)),
            notices,
        );
    };
    let no_data = || {
        Panel::warning(format!(
            "Não há dados válidos para '{}' em {} para o mapa.",
            label,
            ctx.year_label()
        ))
    };
    let Some(slice) = ctx.current() else {
        return (no_data(), notices);
    };

    let values = slice.numeric(column).unwrap_or_default();
    let mut unmapped = BTreeSet::new();
    let mut areas = Vec::new();
    for (row, value) in values.into_iter().enumerate() {
        let region = slice.region(row);
        let Some(code) = region_code(region) else {
            unmapped.insert(region.to_string());
            continue;
        };
        if let Some(value) = value {
            areas.push(MapArea {
                region: region.to_string(),
                code: code.to_string(),
                value,
            });
        }
    }

    if !unmapped.is_empty() {
        let names: Vec<_> = unmapped.into_iter().collect();
        warn!(regions = ?names, "regions without a map code excluded from the map");
        notices.push(Notice::warning(format!(
            "UFs não mapeadas: {}.",
            names.join(", ")
        )));
    }

    if areas.is_empty() {
        return (no_data(), notices);
    }

    let min = areas.iter().map(|a| a.value).fold(f64::INFINITY, f64::min);
    let max = areas.iter().map(|a| a.value).fold(f64::NEG_INFINITY, f64::max);
    let chart = MapChart {
        title: format!("{} por UF em {}", label, ctx.year_label()),
        metric_label: label.to_string(),
        legend_title: short_label(label).to_string(),
        color_scale: COLOR_SCALE,
        min,
        max,
        center: MAP_CENTER,
        zoom: MAP_ZOOM,
        opacity: MAP_OPACITY,
        areas,
    };
    (Panel::Choropleth(chart), notices)
}
