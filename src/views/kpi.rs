use serde::Serialize;

use super::{Panel, RenderContext, Section, SectionId};
use crate::{
    data::{Dataset, COL_POPULATION},
    format,
    stats::{mean, sum},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiCategory {
    Population,
    Economic,
    Social,
}

impl KpiCategory {
    pub fn as_str(&self) -> &str {
        match self {
            KpiCategory::Population => "pop",
            KpiCategory::Economic => "econ",
            KpiCategory::Social => "social",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiCard {
    pub title: String,
    pub value: String,
    pub raw: Option<f64>,
    pub category: KpiCategory,
}

/// National figures over the current-year slice.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NationalKpis {
    pub mean_unemployment: Option<f64>,
    pub mean_income: Option<f64>,
    pub total_population: Option<f64>,
    pub mean_homicide_rate: Option<f64>,
}

impl NationalKpis {
    pub fn compute(slice: &Dataset) -> Self {
        let column_mean = |col: &str| slice.numeric(col).and_then(|v| mean(v));
        Self {
            mean_unemployment: column_mean("taxa_desemprego_media"),
            mean_income: column_mean("renda_media_anual"),
            total_population: slice.numeric(COL_POPULATION).and_then(|v| sum(v)),
            mean_homicide_rate: column_mean("homicidios_por_100k"),
        }
    }

    pub fn cards(&self) -> Vec<KpiCard> {
        vec![
            KpiCard {
                title: "População Total".into(),
                value: format::population(self.total_population),
                raw: self.total_population,
                category: KpiCategory::Population,
            },
            KpiCard {
                title: "Desemprego Médio".into(),
                value: format::percent(self.mean_unemployment),
                raw: self.mean_unemployment,
                category: KpiCategory::Economic,
            },
            KpiCard {
                title: "Renda Média Anual".into(),
                value: format::currency(self.mean_income),
                raw: self.mean_income,
                category: KpiCategory::Economic,
            },
            KpiCard {
                title: "Homicídios (por 100k)".into(),
                value: format::one_decimal(self.mean_homicide_rate),
                raw: self.mean_homicide_rate,
                category: KpiCategory::Social,
            },
        ]
    }
}

pub fn render(ctx: &RenderContext<'_>) -> Section {
    let heading = format!("Indicadores Nacionais - {}", ctx.year_label());
    let body = match ctx.current() {
        Some(slice) => Panel::Kpis {
            cards: NationalKpis::compute(slice).cards(),
        },
        None => Panel::warning(format!(
            "Não há dados para o ano {}.",
            ctx.year_label()
        )),
    };
    Section::new(SectionId::Kpis, heading, body)
}
