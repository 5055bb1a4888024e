// src/render/mod.rs
//! HTML rendering of a [`RenderTree`] as one self-contained page: embedded
//! CSS, inline SVG charts and a GET form carrying the filter state.
pub mod svg;

use crate::{
    filter::{RankOrder, Selection, AGGREGATE_REGION},
    format,
    geo::GeoCollection,
    registry::{metric_labels, METRIC_PAIRS},
    views::{
        table::Cell, DataTable, KpiCard, Notice, NoticeLevel, Panel, RankingChart, RenderTree,
        Section, SectionId,
    },
};

/// Escape text for HTML element content and attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render the whole page. `geometry` supplies the shapes for the map panel.
pub fn render_html(tree: &RenderTree, geometry: Option<&GeoCollection>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
    <div class="layout">
        <aside class="filters">{filters}</aside>
        <main>
            <header><h1>{title}</h1><p class="meta">{subtitle}</p></header>
            {notices}
            {sections}
            <footer>Gerado em {generated_at}</footer>
        </main>
    </div>
</body>
</html>"#,
        title = escape_html(&tree.title),
        subtitle = escape_html(&tree.subtitle),
        css = inline_css(),
        filters = render_filters(tree),
        notices = render_notices(&tree.notices),
        sections = tree
            .sections
            .iter()
            .map(|s| render_section(s, geometry))
            .collect::<Vec<_>>()
            .join("\n"),
        generated_at = escape_html(&tree.generated_at),
    )
}

fn section_anchor(id: SectionId) -> &'static str {
    match id {
        SectionId::Kpis => "kpis",
        SectionId::Map => "mapa",
        SectionId::Ranking => "ranking",
        SectionId::Evolution => "evolucao",
        SectionId::Comparison => "comparativo",
        SectionId::Table => "tabela",
        SectionId::Bivariate => "bivariado",
    }
}

fn level_class(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    }
}

fn render_notices(notices: &[Notice]) -> String {
    notices
        .iter()
        .map(|n| {
            format!(
                r#"<div class="notice {}">{}</div>"#,
                level_class(n.level),
                escape_html(&n.message)
            )
        })
        .collect()
}

fn render_section(section: &Section, geometry: Option<&GeoCollection>) -> String {
    let description = section
        .description
        .as_deref()
        .map(|d| format!(r#"<p class="description">{}</p>"#, escape_html(d)))
        .unwrap_or_default();
    format!(
        r#"<section id="{anchor}"><h2>{heading}</h2>{description}{notices}{body}</section>"#,
        anchor = section_anchor(section.id),
        heading = escape_html(&section.heading),
        description = description,
        notices = render_notices(&section.notices),
        body = render_panel(&section.body, geometry),
    )
}

fn render_panel(panel: &Panel, geometry: Option<&GeoCollection>) -> String {
    match panel {
        Panel::Kpis { cards } => render_kpis(cards),
        Panel::Choropleth(chart) => match geometry {
            Some(geo) => format!(
                "<h3>{}</h3>{}",
                escape_html(&chart.title),
                svg::choropleth(chart, geo)
            ),
            None => render_notices(&[Notice::warning(
                "Não é possível exibir o mapa sem o arquivo GeoJSON.",
            )]),
        },
        Panel::Ranking(chart) => render_ranking(chart),
        Panel::Lines(chart) => format!(
            "<h3>{}</h3>{}",
            escape_html(&chart.title),
            svg::line_chart(chart)
        ),
        Panel::GroupedBars(chart) => format!(
            r#"<h3>{}</h3><p class="meta">{}</p>{}"#,
            escape_html(&chart.title),
            escape_html(&chart.subtitle),
            svg::grouped_bars(chart)
        ),
        Panel::DualAxis(chart) => format!(
            r#"<h3>{}</h3>{}<p class="caption">{}</p>"#,
            escape_html(&chart.title),
            svg::dual_axis(chart),
            escape_html(&chart.caption)
        ),
        Panel::Table(table) => render_table(table),
        Panel::Warning { message } => render_notices(&[Notice::warning(message.as_str())]),
        Panel::Prompt { message } => render_notices(&[Notice::info(message.as_str())]),
        Panel::Hidden => {
            r#"<p class="meta">Marque "Mostrar tabela" nos filtros para exibir os dados.</p>"#
                .to_string()
        }
    }
}

fn render_kpis(cards: &[KpiCard]) -> String {
    let cards: String = cards
        .iter()
        .map(|c| {
            format!(
                r#"<div class="kpi-card {}"><div class="kpi-title">{}</div><div class="kpi-value">{}</div></div>"#,
                c.category.as_str(),
                escape_html(&c.title),
                escape_html(&c.value)
            )
        })
        .collect();
    format!(r#"<div class="kpi-container">{}</div>"#, cards)
}

fn render_ranking(chart: &RankingChart) -> String {
    format!(
        r#"<div class="columns"><div><h3>Top 10 Maiores - {label}</h3>{top}</div><div><h3>Top 10 Menores - {label}</h3>{bottom}</div></div>"#,
        label = escape_html(&chart.metric_label),
        top = svg::horizontal_bars(&chart.top, svg::series_color(0)),
        bottom = svg::horizontal_bars(&chart.bottom, svg::series_color(3)),
    )
}

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => escape_html(s),
        Cell::Integer(i) => i.to_string(),
        Cell::Number(v) => format::two_decimals(*v),
    }
}

fn render_table(table: &DataTable) -> String {
    let head: String = table
        .columns
        .iter()
        .map(|c| format!("<th>{}</th>", escape_html(c)))
        .collect();
    let body: String = table
        .rows
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|c| match c {
                    Cell::Text(_) => format!("<td>{}</td>", render_cell(c)),
                    _ => format!(r#"<td class="num">{}</td>"#, render_cell(c)),
                })
                .collect();
            format!("<tr>{}</tr>", cells)
        })
        .collect();
    format!(
        r#"<div class="table-wrap"><table><thead><tr>{}</tr></thead><tbody>{}</tbody></table></div>"#,
        head, body
    )
}

fn options<'a>(values: impl IntoIterator<Item = &'a str>, selected: &str) -> String {
    values
        .into_iter()
        .map(|v| {
            format!(
                r#"<option value="{v}"{sel}>{v}</option>"#,
                v = escape_html(v),
                sel = if v == selected { " selected" } else { "" }
            )
        })
        .collect()
}

fn render_filters(tree: &RenderTree) -> String {
    let sel: &Selection = &tree.selection;
    let year = tree.year.map(|y| y.to_string()).unwrap_or_default();
    let years: Vec<String> = tree.years.iter().map(|y| y.to_string()).collect();
    let regions =
        std::iter::once(AGGREGATE_REGION).chain(tree.regions.iter().map(String::as_str));
    let comparison_sort = sel.resolve_comparison_sort().unwrap_or_default();

    format!(
        r#"<form method="get" action="/">
<h2>Filtros</h2>
<label>Ano<select name="year">{years}</select></label>
<label>UF<select name="region">{regions}</select></label>
<label>Métrica do mapa<select name="map_metric">{map_metric}</select></label>
<label>Métrica do ranking<select name="ranking_metric">{ranking_metric}</select></label>
<label>Métricas da evolução (separadas por vírgula)<input type="text" name="evolution_metrics" value="{evolution}"></label>
<label>Métricas do comparativo (2 a 3)<input type="text" name="comparison_metrics" value="{comparison}"></label>
<label>Ordenar comparativo por<select name="comparison_sort">{comparison_sort}</select></label>
<label>Exibir<select name="comparison_order">{order}</select></label>
<label>Par bivariado<select name="pair">{pair}</select></label>
<label class="inline"><input type="checkbox" name="show_table" value="true"{table}> Mostrar tabela</label>
<button type="submit">Atualizar</button>
</form>"#,
        years = options(years.iter().map(String::as_str), &year),
        regions = options(regions, sel.region.as_str()),
        map_metric = options(metric_labels(), &sel.map_metric),
        ranking_metric = options(metric_labels(), &sel.ranking_metric),
        evolution = escape_html(&sel.effective_evolution_metrics().join(", ")),
        comparison = escape_html(&sel.comparison_metrics.join(", ")),
        comparison_sort = options(
            sel.comparison_metrics.iter().map(String::as_str),
            comparison_sort
        ),
        order = [RankOrder::Top, RankOrder::Bottom]
            .iter()
            .map(|o| format!(
                r#"<option value="{}"{}>{}</option>"#,
                o.as_str(),
                if *o == sel.comparison_order { " selected" } else { "" },
                o.label()
            ))
            .collect::<String>(),
        pair = options(METRIC_PAIRS.iter().map(|p| p.label), &sel.pair),
        table = if sel.show_table { " checked" } else { "" },
    )
}

fn inline_css() -> &'static str {
    r#"
* { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, -apple-system, 'Segoe UI', sans-serif; color: #111827; background: #f3f4f6; line-height: 1.5; }
.layout { display: grid; grid-template-columns: 300px 1fr; min-height: 100vh; }
.filters { background: #ffffff; padding: 1.5rem; border-right: 1px solid #e5e7eb; }
.filters label { display: block; font-size: 0.85rem; font-weight: 600; margin-bottom: 0.9rem; }
.filters label.inline { font-weight: 400; }
.filters select, .filters input[type=text] { display: block; width: 100%; margin-top: 0.25rem; padding: 0.35rem; }
.filters button { width: 100%; padding: 0.5rem; background: #007bff; color: #fff; border: 0; border-radius: 4px; cursor: pointer; }
main { padding: 2rem; max-width: 1400px; }
header h1 { margin: 0 0 0.25rem; }
.meta { color: #6b7280; font-size: 0.9rem; }
section { background: #ffffff; border-radius: 8px; padding: 1.5rem; margin: 1.5rem 0; box-shadow: 0 1px 3px rgba(0, 0, 0, 0.08); }
section h2 { margin-top: 0; }
.description, .caption { color: #4b5563; }
.columns { display: grid; grid-template-columns: 1fr 1fr; gap: 1.5rem; }
.notice { padding: 0.75rem 1rem; border-radius: 6px; margin: 0.5rem 0; }
.notice.info { background: #eff6ff; color: #1e40af; }
.notice.warning { background: #fffbeb; color: #92400e; }
.notice.error { background: #fef2f2; color: #991b1b; }
.kpi-container { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 1.5rem; margin-bottom: 2rem; }
.kpi-card { background-color: #FFFFFF; border-radius: 8px; padding: 1.5rem; text-align: center; box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1); border-left: 5px solid #007bff; transition: transform 0.2s ease-in-out; }
.kpi-card:hover { transform: translateY(-5px); }
.kpi-title { font-size: 0.9rem; color: #555; margin-bottom: 0.5rem; font-weight: 600; text-transform: uppercase; }
.kpi-value { font-size: 2rem; font-weight: 700; color: #333; }
.kpi-card.pop { border-left-color: #17a2b8; }
.kpi-card.econ { border-left-color: #28a745; }
.kpi-card.social { border-left-color: #dc3545; }
.table-wrap { max-height: 480px; overflow: auto; }
table { border-collapse: collapse; width: 100%; font-size: 0.85rem; }
th, td { padding: 0.4rem 0.6rem; border-bottom: 1px solid #e5e7eb; text-align: left; }
th { position: sticky; top: 0; background: #f9fafb; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
footer { color: #9ca3af; font-size: 0.8rem; margin-top: 2rem; }
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dashboard::Dashboard,
        data::parse_csv,
        filter::DashboardEvent,
        test_support::{SAMPLE_CSV, SAMPLE_GEOJSON},
    };
    use anyhow::Result;

    fn sample() -> Result<Dashboard> {
        Ok(Dashboard::new(
            parse_csv(SAMPLE_CSV.as_bytes())?,
            Some(GeoCollection::from_json(SAMPLE_GEOJSON)?),
        ))
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">R&D's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;R&amp;D&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_page_has_every_section_and_kpis() -> Result<()> {
        let dashboard = sample()?;
        let tree = dashboard.render(&Selection::default());
        let html = render_html(&tree, dashboard.geometry());
        assert!(html.starts_with("<!DOCTYPE html>"));
        for anchor in ["kpis", "mapa", "ranking", "evolucao", "comparativo", "tabela", "bivariado"] {
            assert!(html.contains(&format!(r#"<section id="{}">"#, anchor)), "{}", anchor);
        }
        assert!(html.contains(r#"<div class="kpi-card pop"><div class="kpi-title">População Total</div><div class="kpi-value">62.210.000</div></div>"#));
        assert!(html.contains("Correlação de Pearson para 2021"));
        assert!(html.contains(r#"<option value="2021" selected>2021</option>"#));
        assert!(html.contains("Marque \"Mostrar tabela\""));
        Ok(())
    }

    #[test]
    fn test_table_and_warnings_render() -> Result<()> {
        let dashboard = sample()?;
        let tree = dashboard.render(&Selection::from_events([
            DashboardEvent::ToggleTable(true),
            DashboardEvent::SelectComparisonMetrics(vec!["Renda Média Anual".into()]),
        ]));
        let html = render_html(&tree, None);
        assert!(html.contains(r#"<td class="num">900000.00</td>"#));
        assert!(html.contains(r#"<div class="notice info">Selecione pelo menos duas métricas para comparação.</div>"#));
        assert!(html.contains(r#"name="show_table" value="true" checked"#));
        // no geometry: the map falls back to a warning
        assert!(html.contains("Não é possível exibir o mapa sem o arquivo GeoJSON."));
        Ok(())
    }

    #[test]
    fn test_notices_are_escaped() {
        let html = render_notices(&[Notice::error("<b>falha</b>")]);
        assert_eq!(html, r#"<div class="notice error">&lt;b&gt;falha&lt;/b&gt;</div>"#);
    }
}
