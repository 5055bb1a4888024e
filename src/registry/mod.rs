// src/registry/mod.rs
//! Fixed lookup tables shared by every render pass: display label ↔ column
//! for the selectable metrics, the national aggregates, the bivariate pairs
//! and the region name → code table used by the map join.
pub mod regions;

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

pub use regions::{region_code, REGION_CODES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub label: &'static str,
    pub column: &'static str,
}

const fn metric(label: &'static str, column: &'static str) -> Metric {
    Metric { label, column }
}

/// Selectable metrics, in widget order.
pub const METRICS: [Metric; 12] = [
    metric("Taxa de Desemprego (%)", "taxa_desemprego_media"),
    metric("Renda Média Anual", "renda_media_anual"),
    metric("População Total", "Populacao_total"),
    metric("Taxa de Escolarização (Fundamental %)", "perc_esc_fundamental"),
    metric("Taxa de Escolarização (Médio %)", "perc_esc_medio"),
    metric("Homicídios (por 100k hab.)", "homicidios_por_100k"),
    metric("Suicídios (por 100k hab.)", "obitos_suicidio_por_100k"),
    metric("Internações Cardio (por 100k hab.)", "internacoes_cardio_por_100k"),
    metric("Mortes Cardio (por 100k hab.)", "mortes_cardio_por_100k"),
    metric("Óbitos Transporte (por 100k hab.)", "obitos_transporte_por_100k"),
    metric("Homicídios (Absoluto)", "num_homicidios"),
    metric("Homicídios Arma de Fogo (Absoluto)", "num_homicidios_arma"),
];

static BY_LABEL: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| METRICS.iter().map(|m| (m.label, m.column)).collect());

static BY_COLUMN: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| METRICS.iter().map(|m| (m.column, m.label)).collect());

/// Label → column.
pub fn column_for(label: &str) -> Option<&'static str> {
    BY_LABEL.get(label).copied()
}

/// Column → label.
pub fn label_for(column: &str) -> Option<&'static str> {
    BY_COLUMN.get(column).copied()
}

/// Display label for a column, or the column itself when it is not registered.
pub fn display_name(column: &str) -> String {
    label_for(column)
        .map(str::to_string)
        .unwrap_or_else(|| column.to_string())
}

pub fn metric_labels() -> Vec<&'static str> {
    METRICS.iter().map(|m| m.label).collect()
}

/// Label up to the first `(`, used for legends.
pub fn short_label(label: &str) -> &str {
    label.split('(').next().unwrap_or(label).trim()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Mean,
    Sum,
}

/// A metric available for the "Brasil" evolution, aggregated across regions per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NationalMetric {
    pub label: &'static str,
    pub source: &'static str,
    pub aggregation: Aggregation,
}

pub const NATIONAL_METRICS: [NationalMetric; 4] = [
    NationalMetric {
        label: "Taxa de Desemprego (%)",
        source: "taxa_desemprego_media",
        aggregation: Aggregation::Mean,
    },
    NationalMetric {
        label: "Renda Média Anual",
        source: "renda_media_anual",
        aggregation: Aggregation::Mean,
    },
    NationalMetric {
        label: "Homicídios (por 100k hab.)",
        source: "homicidios_por_100k",
        aggregation: Aggregation::Mean,
    },
    NationalMetric {
        label: "População Total",
        source: "Populacao_total",
        aggregation: Aggregation::Sum,
    },
];

pub fn national_metric(label: &str) -> Option<&'static NationalMetric> {
    NATIONAL_METRICS.iter().find(|m| m.label == label)
}

/// Two metrics compared on one chart: `first` as bars, `second` as a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricPair {
    pub label: &'static str,
    pub first: &'static str,
    pub second: &'static str,
}

const fn pair(label: &'static str, first: &'static str, second: &'static str) -> MetricPair {
    MetricPair {
        label,
        first,
        second,
    }
}

pub const METRIC_PAIRS: [MetricPair; 10] = [
    pair(
        "Renda Média vs Mortes Cardio (100k)",
        "renda_media_anual",
        "mortes_cardio_por_100k",
    ),
    pair(
        "Renda Média vs Internações Cardio (100k)",
        "renda_media_anual",
        "internacoes_cardio_por_100k",
    ),
    pair(
        "Escolaridade Média (%) vs Mortes Cardio (100k)",
        "perc_esc_medio",
        "mortes_cardio_por_100k",
    ),
    pair(
        "Escolaridade Média (%) vs Internações Cardio (100k)",
        "perc_esc_medio",
        "internacoes_cardio_por_100k",
    ),
    pair(
        "Escolaridade Fundamental (%) vs Mortes Cardio (100k)",
        "perc_esc_fundamental",
        "mortes_cardio_por_100k",
    ),
    pair(
        "Escolaridade Fundamental (%) vs Internações Cardio (100k)",
        "perc_esc_fundamental",
        "internacoes_cardio_por_100k",
    ),
    pair(
        "Suicídios (100k) vs Mortes Cardio (100k)",
        "obitos_suicidio_por_100k",
        "mortes_cardio_por_100k",
    ),
    pair(
        "Suicídios (100k) vs Internações Cardio (100k)",
        "obitos_suicidio_por_100k",
        "internacoes_cardio_por_100k",
    ),
    pair(
        "Renda Média vs Homicídios (100k)",
        "renda_media_anual",
        "homicidios_por_100k",
    ),
    pair(
        "Renda Média vs Desemprego (%)",
        "renda_media_anual",
        "taxa_desemprego_media",
    ),
];

pub fn metric_pair(label: &str) -> Option<&'static MetricPair> {
    METRIC_PAIRS.iter().find(|p| p.label == label)
}
