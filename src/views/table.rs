use serde::Serialize;
use tracing::debug;

use super::{Panel, RenderContext, Section, SectionId};
use crate::data::{Dataset, COL_POPULATION, COL_REGION, COL_YEAR, RATE_SUFFIX};

/// Shown first, in this order, when present.
pub const CORE_COLUMNS: [&str; 9] = [
    COL_REGION,
    COL_YEAR,
    COL_POPULATION,
    "taxa_desemprego_media",
    "renda_media_anual",
    "perc_esc_fundamental",
    "perc_esc_medio",
    "homicidios_por_100k",
    "obitos_suicidio_por_100k",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Number(Option<f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Core columns followed by every other derived rate column.
pub fn table_columns(dataset: &Dataset) -> Vec<String> {
    let mut columns: Vec<String> = CORE_COLUMNS
        .iter()
        .filter(|c| dataset.has_column(c))
        .map(|c| c.to_string())
        .collect();
    for name in dataset.column_names() {
        if name.ends_with(RATE_SUFFIX) && !columns.contains(&name) {
            columns.push(name);
        }
    }
    columns
}

pub fn build_table(dataset: &Dataset) -> anyhow::Result<DataTable> {
    let sorted = dataset.sorted_by_region_year()?;
    let columns = table_columns(&sorted);
    let values: Vec<Option<Vec<Option<f64>>>> = columns
        .iter()
        .map(|c| match c.as_str() {
            COL_REGION | COL_YEAR => None,
            other => sorted.numeric(other),
        })
        .collect();

    let rows = (0..sorted.num_rows())
        .map(|row| {
            columns
                .iter()
                .zip(&values)
                .map(|(name, vals)| match (name.as_str(), vals) {
                    (COL_REGION, _) => Cell::Text(sorted.region(row).to_string()),
                    (COL_YEAR, _) => Cell::Integer(sorted.year(row)),
                    (_, Some(vals)) => Cell::Number(vals[row]),
                    (_, None) => Cell::Number(None),
                })
                .collect()
        })
        .collect();
    Ok(DataTable { columns, rows })
}

pub fn render(ctx: &RenderContext<'_>) -> Section {
    let heading = "Tabela de Dados Anual Consolidada";
    if !ctx.selection.show_table {
        return Section::new(SectionId::Table, heading, Panel::Hidden);
    }
    let body = match build_table(ctx.dataset) {
        Ok(table) if !table.rows.is_empty() => Panel::Table(table),
        Ok(_) => Panel::warning("Não há dados para exibir na tabela."),
        Err(e) => {
            debug!("table unavailable: {:#}", e);
            Panel::warning("Não foi possível montar a tabela de dados.")
        }
    };
    Section::new(SectionId::Table, heading, body)
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

    #[test]
    fn test_hidden_by_default() {
        let ds = sample_dataset();
        let sel = Selection::default();
        let section = render(&context(&ds, None, &sel, 2021));
        assert!(matches!(section.body, Panel::Hidden));
    }

    #[test]
    fn test_core_then_rate_columns_sorted_rows() {
        let ds = sample_dataset();
        let sel = Selection::from_events([DashboardEvent::ToggleTable(true)]);
        let section = render(&context(&ds, None, &sel, 2021));
        let Panel::Table(table) = &section.body else {
            panic!("expected a table, got {:?}", section.body);
        };
        assert_eq!(&table.columns[..3], &["UF", "Ano", "Populacao_total"]);
        assert_eq!(table.columns.len(), 12);
        assert!(table.columns[9..].iter().all(|c| c.ends_with("_por_100k")));
        assert!(!table.columns.contains(&"num_homicidios".to_string()));

        // whole dataset, not the current-year slice
        assert_eq!(table.rows.len(), 6);
        assert_eq!(table.rows[0][0], Cell::Text("Acre".into()));
        assert_eq!(table.rows[0][1], Cell::Integer(2020));
        assert_eq!(table.rows[1][1], Cell::Integer(2021));
        assert_eq!(table.rows[5][0], Cell::Text("São Paulo".into()));
        assert_eq!(table.rows[0][2], Cell::Number(Some(900000.0)));
    }

    #[test]
    fn test_absent_core_columns_are_skipped() -> Result<()> {
        let ds = parse_csv("Ano,UF,Populacao_total,extra\n2020,Acre,100,x\n".as_bytes())?.dataset;
        let table = build_table(&ds)?;
        assert_eq!(table.columns, vec!["UF", "Ano", "Populacao_total"]);
        Ok(())
    }

    #[test]
    fn test_cells_serialize_untagged() -> Result<()> {
        let row = vec![
            Cell::Text("Acre".into()),
            Cell::Integer(2020),
            Cell::Number(None),
            Cell::Number(Some(1.5)),
        ];
        assert_eq!(serde_json::to_string(&row)?, r#"["Acre",2020,null,1.5]"#);
        Ok(())
    }
}
