pub mod config;
pub mod dashboard;
pub mod data;
pub mod filter;
pub mod format;
pub mod geo;
pub mod registry;
pub mod render;
pub mod server;
pub mod stats;
pub mod views;

pub use dashboard::Dashboard;
pub use data::{load_dataset, Dataset, LoadReport, LoadedData};
pub use filter::{DashboardEvent, RankOrder, RegionChoice, Selection};
pub use geo::{load_geometry, GeoCollection};
pub use views::RenderTree;

#[cfg(test)]
pub(crate) mod test_support {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    pub fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,painel=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    /// A small two-year fixture covering three regions.
    pub const SAMPLE_CSV: &str = "\
Ano,UF,Populacao_total,taxa_desemprego_media,renda_media_anual,perc_esc_fundamental,perc_esc_medio,num_homicidios,num_obitos_suicidio,num_internacoes_cardio,num_mortes_cardio,num_obitos_transporte,num_homicidios_arma
2020,Acre,900000,12.5,20000.50,90.1,70.2,90,45,900,180,27,60
2020,Bahia,15000000,18.0,15000.00,88.0,65.0,6000,600,30000,9000,3000,4500
2020,São Paulo,46000000,13.0,35000.00,97.0,80.0,3000,2300,92000,27600,5520,1500
2021,Acre,910000,11.0,21000.00,91.0,71.0,91,46,910,182,28,61
2021,Bahia,15100000,17.0,15500.00,89.0,66.0,5900,610,31000,9100,3050,4400
2021,São Paulo,46200000,12.0,36000.00,97.5,81.0,2900,2350,93000,27700,5600,1450
";

    /// Two areal features (AC by `id`, BA by `properties.id`) and one point.
    pub const SAMPLE_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "id": "AC", "properties": {"name": "Acre"},
     "geometry": {"type": "Polygon", "coordinates": [[[-73.0, -7.0], [-67.0, -7.0], [-67.0, -11.0], [-73.0, -11.0], [-73.0, -7.0]]]}},
    {"type": "Feature", "properties": {"id": "BA"},
     "geometry": {"type": "MultiPolygon", "coordinates": [[[[-46.0, -9.0], [-38.0, -9.0], [-38.0, -18.0, 0.0], [-46.0, -9.0]]]]}},
    {"type": "Feature", "id": "XX", "properties": {},
     "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}}
  ]
}"#;

    pub fn sample_dataset() -> crate::data::Dataset {
        crate::data::parse_csv(SAMPLE_CSV.as_bytes())
            .expect("sample csv parses")
            .dataset
    }

    /// A render context for `year` over `ds`.
    pub fn context<'a>(
        ds: &'a crate::data::Dataset,
        geo: Option<&'a crate::geo::GeoCollection>,
        sel: &'a crate::filter::Selection,
        year: i64,
    ) -> crate::views::RenderContext<'a> {
        crate::views::RenderContext {
            dataset: ds,
            current: Some(ds.for_year(year).expect("year filter")),
            year: Some(year),
            geometry: geo,
            selection: sel,
        }
    }
}
