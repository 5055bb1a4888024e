// src/dashboard.rs
use anyhow::Result;
use chrono::Local;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

use crate::{
    config::Settings,
    data::{load_dataset, DropReason, LoadReport, LoadedData},
    filter::Selection,
    geo::{load_geometry, GeoCollection},
    views::{render_sections, Notice, RenderContext, RenderTree},
    Dataset,
};

pub const TITLE: &str = "Painel Socioeconômico do Brasil";
pub const SUBTITLE: &str =
    "Análise de indicadores socioeconômicos por Unidade da Federação (UF) e Ano.";

/// The loaded inputs, immutable for the life of the process. Every render
/// pass reads from here and builds its own filtered copies.
#[derive(Debug)]
pub struct Dashboard {
    dataset: Dataset,
    report: LoadReport,
    geometry: Option<GeoCollection>,
    years: Vec<i64>,
    regions: Vec<String>,
    load_notices: Vec<Notice>,
}

impl Dashboard {
    pub fn new(loaded: LoadedData, geometry: Option<GeoCollection>) -> Self {
        let LoadedData { dataset, report } = loaded;
        let years = dataset.years();
        let regions = dataset.regions();
        let load_notices = load_notices(&report, geometry.is_some());
        Self {
            dataset,
            report,
            geometry,
            years,
            regions,
            load_notices,
        }
    }

    /// Load the dataset and geometry named by `settings`. Only dataset
    /// failures are errors; missing geometry leaves the map disabled.
    #[instrument(level = "info", skip_all)]
    pub fn load(settings: &Settings) -> Result<Self> {
        let loaded = load_dataset(&settings.data_path)?;
        let geometry = load_geometry(&settings.geo_path);
        let dashboard = Self::new(loaded, geometry);
        info!(
            years = dashboard.years.len(),
            regions = dashboard.regions.len(),
            map = dashboard.geometry.is_some(),
            "dashboard ready"
        );
        Ok(dashboard)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn geometry(&self) -> Option<&GeoCollection> {
        self.geometry.as_ref()
    }

    /// Most recent first.
    pub fn years(&self) -> &[i64] {
        &self.years
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    /// One full render pass for `selection`.
    pub fn render(&self, selection: &Selection) -> RenderTree {
        let year = selection.resolve_year(&self.years);
        let current = year.and_then(|y| match self.dataset.for_year(y) {
            Ok(slice) => Some(slice),
            Err(e) => {
                warn!(year = y, "year slice unavailable: {:#}", e);
                None
            }
        });
        let ctx = RenderContext {
            dataset: &self.dataset,
            current,
            year,
            geometry: self.geometry.as_ref(),
            selection,
        };
        RenderTree {
            title: TITLE.to_string(),
            subtitle: SUBTITLE.to_string(),
            year,
            years: self.years.clone(),
            regions: self.regions.clone(),
            selection: selection.clone(),
            notices: self.load_notices.clone(),
            dropped: self.report().dropped.clone(),
            sections: render_sections(&ctx),
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

fn reason_label(reason: &DropReason) -> &'static str {
    match reason {
        DropReason::MissingRegion => "UF ausente",
        DropReason::InvalidYear { .. } => "ano inválido",
        DropReason::InvalidPopulation { .. } => "população inválida",
        DropReason::NonPositivePopulation { .. } => "população não positiva",
        DropReason::DuplicateKey => "UF e ano duplicados",
    }
}

/// Load-time degradations, repeated on every render.
fn load_notices(report: &LoadReport, has_geometry: bool) -> Vec<Notice> {
    let mut notices: Vec<Notice> = report
        .missing_columns
        .iter()
        .map(|c| {
            Notice::warning(format!(
                "Coluna '{}' não encontrada no CSV para cálculo de taxa.",
                c
            ))
        })
        .collect();

    if !report.dropped.is_empty() {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for row in &report.dropped {
            *counts.entry(reason_label(&row.reason)).or_default() += 1;
        }
        let detail: Vec<String> = counts
            .into_iter()
            .map(|(label, n)| format!("{}: {}", label, n))
            .collect();
        notices.push(Notice::warning(format!(
            "{} linha(s) descartada(s) ao carregar os dados ({}).",
            report.dropped.len(),
            detail.join("; ")
        )));
    }

    if !has_geometry {
        notices.push(Notice::error(
            "Arquivo GeoJSON não encontrado ou inválido. O mapa não será exibido.",
        ));
    }
    notices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::parse_csv,
        filter::{DashboardEvent, RegionChoice},
        test_support::{init_test_logging, SAMPLE_CSV, SAMPLE_GEOJSON},
        views::{NoticeLevel, Panel, SectionId},
    };
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample(geo: bool) -> Result<Dashboard> {
        let loaded = parse_csv(SAMPLE_CSV.as_bytes())?;
        let geometry = if geo {
            Some(GeoCollection::from_json(SAMPLE_GEOJSON)?)
        } else {
            None
        };
        Ok(Dashboard::new(loaded, geometry))
    }

    #[test]
    fn test_default_render_uses_latest_year() -> Result<()> {
        let dashboard = sample(true)?;
        let tree = dashboard.render(&Selection::default());
        assert_eq!(tree.year, Some(2021));
        assert_eq!(tree.years, vec![2021, 2020]);
        assert_eq!(tree.sections.len(), 7);
        assert!(tree.notices.is_empty());
        assert!(matches!(
            tree.section(SectionId::Map).map(|s| &s.body),
            Some(Panel::Choropleth(_))
        ));
        Ok(())
    }

    #[test]
    fn test_missing_geometry_degrades_only_the_map() -> Result<()> {
        init_test_logging();
        let dashboard = sample(false)?;
        let tree = dashboard.render(&Selection::default());
        assert_eq!(tree.notices.len(), 1);
        assert_eq!(tree.notices[0].level, NoticeLevel::Error);
        for section in &tree.sections {
            match section.id {
                SectionId::Map => assert!(section.body.is_warning()),
                SectionId::Table => assert!(matches!(section.body, Panel::Hidden)),
                _ => assert!(!section.body.is_warning(), "{:?}", section.id),
            }
        }
        Ok(())
    }

    #[test]
    fn test_year_without_rows_warns_per_section() -> Result<()> {
        let dashboard = sample(true)?;
        let tree = dashboard.render(&Selection::from_events([DashboardEvent::SelectYear(1999)]));
        assert_eq!(tree.year, Some(1999));
        for id in [SectionId::Kpis, SectionId::Map, SectionId::Ranking, SectionId::Bivariate] {
            let section = tree.section(id).expect("section present");
            assert!(section.body.is_warning(), "{:?}", id);
        }
        Ok(())
    }

    #[test]
    fn test_load_notices_surface_drops_and_missing_columns() -> Result<()> {
        let loaded = parse_csv(
            "Ano,UF,Populacao_total\n2020,Acre,100\n2020,Acre,100\nx,Bahia,1\n".as_bytes(),
        )?;
        let dashboard = Dashboard::new(loaded, None);
        let tree = dashboard.render(&Selection::default());
        let messages: Vec<_> = tree.notices.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages.len(), 5 + 1 + 1);
        assert!(messages[0].starts_with("Coluna 'num_homicidios'"));
        assert!(messages[5].starts_with("2 linha(s) descartada(s)"));
        assert!(messages[5].contains("ano inválido: 1"));
        Ok(())
    }

    #[test]
    fn test_region_without_code_stays_in_other_views() -> Result<()> {
        init_test_logging();
        let loaded = parse_csv(
            "Ano,UF,Populacao_total,taxa_desemprego_media,renda_media_anual\n\
             2020,Acre,900000,12.5,20000\n\
             2020,Atlântida,500000,30.0,9000\n\
             2021,Acre,910000,11.0,21000\n\
             2021,Atlântida,510000,28.0,9500\n"
                .as_bytes(),
        )?;
        let dashboard = Dashboard::new(loaded, Some(GeoCollection::from_json(SAMPLE_GEOJSON)?));
        let tree = dashboard.render(&Selection::default());

        let map = tree.section(SectionId::Map).expect("map section");
        assert!(map.notices.iter().any(|n| n.message.contains("Atlântida")));
        let Panel::Choropleth(chart) = &map.body else {
            panic!("expected a map, got {:?}", map.body);
        };
        assert!(chart.areas.iter().all(|a| a.region != "Atlântida"));

        let ranking = tree.section(SectionId::Ranking).expect("ranking section");
        let Panel::Ranking(chart) = &ranking.body else {
            panic!("expected a ranking, got {:?}", ranking.body);
        };
        assert_eq!(chart.top[0].region, "Atlântida");

        let comparison = tree.section(SectionId::Comparison).expect("comparison section");
        let Panel::GroupedBars(chart) = &comparison.body else {
            panic!("expected grouped bars, got {:?}", comparison.body);
        };
        assert!(chart.regions.iter().any(|r| r == "Atlântida"));

        let tree = dashboard.render(&Selection::from_events([DashboardEvent::SelectRegion(
            RegionChoice::Region("Atlântida".into()),
        )]));
        let evolution = tree.section(SectionId::Evolution).expect("evolution section");
        let Panel::Lines(chart) = &evolution.body else {
            panic!("expected lines, got {:?}", evolution.body);
        };
        assert_eq!(chart.title, "Evolução de Indicadores para Atlântida");
        assert_eq!(chart.points.len(), 4);
        Ok(())
    }

    #[test]
    fn test_render_lists_dropped_rows() -> Result<()> {
        let loaded = parse_csv("Ano,UF,Populacao_total\n2020,Acre,100\n2020,Bahia,0\n".as_bytes())?;
        let dashboard = Dashboard::new(loaded, None);
        let tree = dashboard.render(&Selection::default());
        assert_eq!(tree.dropped.len(), 1);
        assert_eq!(tree.dropped[0].line, 3);
        assert_eq!(tree.dropped[0].region.as_deref(), Some("Bahia"));
        assert_eq!(tree.dropped, dashboard.report().dropped);
        Ok(())
    }

    #[test]
    fn test_load_from_settings() -> Result<()> {
        let mut csv = NamedTempFile::new()?;
        csv.write_all(SAMPLE_CSV.as_bytes())?;
        let settings = Settings {
            data_path: csv.path().to_path_buf(),
            geo_path: "nao-existe.json".into(),
            ..Default::default()
        };
        let dashboard = Dashboard::load(&settings)?;
        assert_eq!(dashboard.regions(), ["Acre", "Bahia", "São Paulo"]);
        assert!(dashboard.geometry().is_none());
        Ok(())
    }

    #[test]
    fn test_missing_data_file_is_fatal() {
        let settings = Settings {
            data_path: "nao-existe.csv".into(),
            ..Default::default()
        };
        assert!(Dashboard::load(&settings).is_err());
    }
}
