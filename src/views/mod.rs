// src/views/mod.rs
//! One renderer per dashboard section. Each takes the shared, read-only
//! [`RenderContext`] and returns a [`Section`]; none of them can fail, a
//! section without usable data carries a warning panel instead of a chart.
pub mod bivariate;
pub mod comparison;
pub mod evolution;
pub mod kpi;
pub mod map;
pub mod ranking;
pub mod table;

use serde::Serialize;

use crate::{
    data::{Dataset, DroppedRow},
    filter::Selection,
    format::NOT_AVAILABLE,
    geo::GeoCollection,
};

pub use bivariate::DualAxisChart;
pub use comparison::GroupedBarChart;
pub use evolution::LineChart;
pub use kpi::KpiCard;
pub use map::MapChart;
pub use ranking::RankingChart;
pub use table::DataTable;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
    Kpis,
    Map,
    Ranking,
    Evolution,
    Comparison,
    Table,
    Bivariate,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Panel {
    Kpis { cards: Vec<KpiCard> },
    Choropleth(MapChart),
    Ranking(RankingChart),
    Lines(LineChart),
    GroupedBars(GroupedBarChart),
    DualAxis(DualAxisChart),
    Table(DataTable),
    /// Required data is missing or empty for the current filters.
    Warning { message: String },
    /// The user must change a selection before anything can be drawn.
    Prompt { message: String },
    /// Section switched off by the user.
    Hidden,
}

impl Panel {
    pub fn warning(message: impl Into<String>) -> Self {
        Panel::Warning {
            message: message.into(),
        }
    }

    pub fn prompt(message: impl Into<String>) -> Self {
        Panel::Prompt {
            message: message.into(),
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Panel::Warning { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub id: SectionId,
    pub heading: String,
    pub description: Option<String>,
    pub notices: Vec<Notice>,
    pub body: Panel,
}

impl Section {
    pub fn new(id: SectionId, heading: impl Into<String>, body: Panel) -> Self {
        Self {
            id,
            heading: heading.into(),
            description: None,
            notices: Vec::new(),
            body,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_notices(mut self, notices: Vec<Notice>) -> Self {
        self.notices = notices;
        self
    }
}

/// Everything a render pass reads. Built once per interaction.
pub struct RenderContext<'a> {
    pub dataset: &'a Dataset,
    /// The current-year slice; `None` when no year could be resolved.
    pub current: Option<Dataset>,
    pub year: Option<i64>,
    pub geometry: Option<&'a GeoCollection>,
    pub selection: &'a Selection,
}

impl<'a> RenderContext<'a> {
    /// The current-year slice when it has at least one row.
    pub fn current(&self) -> Option<&Dataset> {
        self.current.as_ref().filter(|d| !d.is_empty())
    }

    pub fn year_label(&self) -> String {
        self.year
            .map(|y| y.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

/// The full render output of one interaction.
#[derive(Debug, Clone, Serialize)]
pub struct RenderTree {
    pub title: String,
    pub subtitle: String,
    pub year: Option<i64>,
    pub years: Vec<i64>,
    pub regions: Vec<String>,
    pub selection: Selection,
    pub notices: Vec<Notice>,
    /// Rows discarded at load time, with line and reason.
    pub dropped: Vec<DroppedRow>,
    pub sections: Vec<Section>,
    pub generated_at: String,
}

impl RenderTree {
    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }
}

/// Every section, in page order.
pub fn render_sections(ctx: &RenderContext<'_>) -> Vec<Section> {
    vec![
        kpi::render(ctx),
        map::render(ctx),
        ranking::render(ctx),
        evolution::render(ctx),
        comparison::render(ctx),
        table::render(ctx),
        bivariate::render(ctx),
    ]
}
