// src/data/mod.rs
pub mod utils;

use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{Array, ArrayRef, BooleanArray, Float64Array, Float64Builder, Int64Array, StringArray, UInt32Array},
    compute::{concat_batches, filter_record_batch, take_record_batch},
    csv::{reader::Format, ReaderBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use serde::Serialize;
use std::{
    collections::{BTreeSet, HashSet},
    fmt,
    fs::File,
    io::Read,
    path::Path,
    sync::Arc,
};
use tracing::{debug, info, warn};

use utils::{clean_str, coerce_numeric, infer_column_dtype, parse_number, round2};

pub const COL_YEAR: &str = "Ano";
pub const COL_REGION: &str = "UF";
pub const COL_POPULATION: &str = "Populacao_total";

/// Absolute-count columns and the per-100k rate column derived from each.
pub const RATE_SOURCES: [(&str, &str); 5] = [
    ("num_homicidios", "homicidios_por_100k"),
    ("num_obitos_suicidio", "obitos_suicidio_por_100k"),
    ("num_internacoes_cardio", "internacoes_cardio_por_100k"),
    ("num_mortes_cardio", "mortes_cardio_por_100k"),
    ("num_obitos_transporte", "obitos_transporte_por_100k"),
];

pub const RATE_SUFFIX: &str = "_por_100k";

const BATCH_SIZE: usize = 8192;
const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Why a CSV row did not make it into the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    MissingRegion,
    InvalidYear { raw: String },
    InvalidPopulation { raw: String },
    NonPositivePopulation { value: f64 },
    DuplicateKey,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::MissingRegion => write!(f, "missing {}", COL_REGION),
            DropReason::InvalidYear { raw } => write!(f, "invalid {} `{}`", COL_YEAR, raw),
            DropReason::InvalidPopulation { raw } => {
                write!(f, "non-numeric {} `{}`", COL_POPULATION, raw)
            }
            DropReason::NonPositivePopulation { value } => {
                write!(f, "non-positive {} {}", COL_POPULATION, value)
            }
            DropReason::DuplicateKey => write!(f, "duplicate ({}, {})", COL_REGION, COL_YEAR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedRow {
    /// 1-based line number in the source file (the header is line 1).
    pub line: usize,
    pub region: Option<String>,
    #[serde(flatten)]
    pub reason: DropReason,
}

/// Non-fatal findings from a load.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub dropped: Vec<DroppedRow>,
    /// Known count columns absent from the input; their rates were not derived.
    pub missing_columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LoadedData {
    pub dataset: Dataset,
    pub report: LoadReport,
}

/// Immutable, typed view over the loaded table. `UF` is non-null Utf8 and
/// `Ano` non-null Int64; every other column is Float64 or Utf8.
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
    regions: StringArray,
    years: Int64Array,
}

impl Dataset {
    pub fn new(batch: RecordBatch) -> Result<Self> {
        let regions = batch
            .column_by_name(COL_REGION)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .cloned()
            .ok_or_else(|| anyhow!("column `{}` missing or not text", COL_REGION))?;
        let years = batch
            .column_by_name(COL_YEAR)
            .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
            .cloned()
            .ok_or_else(|| anyhow!("column `{}` missing or not integer", COL_YEAR))?;
        if regions.null_count() > 0 || years.null_count() > 0 {
            bail!("`{}` and `{}` must not contain nulls", COL_REGION, COL_YEAR);
        }
        Ok(Self {
            batch,
            regions,
            years,
        })
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn region(&self, row: usize) -> &str {
        self.regions.value(row)
    }

    pub fn year(&self, row: usize) -> i64 {
        self.years.value(row)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.batch.schema().index_of(name).is_ok()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Column `name` coerced to numbers; `None` when the column does not exist.
    pub fn numeric(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.batch.column_by_name(name).map(coerce_numeric)
    }

    /// Distinct years, most recent first.
    pub fn years(&self) -> Vec<i64> {
        let set: BTreeSet<i64> = self.years.values().iter().copied().collect();
        set.into_iter().rev().collect()
    }

    /// Distinct region names, sorted.
    pub fn regions(&self) -> Vec<String> {
        let set: BTreeSet<&str> = (0..self.num_rows()).map(|i| self.region(i)).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Rows for which `keep` returns true, in their original order.
    pub fn filter_rows(&self, keep: impl Fn(usize) -> bool) -> Result<Dataset> {
        let mask: BooleanArray = (0..self.num_rows()).map(|i| Some(keep(i))).collect();
        let batch = filter_record_batch(&self.batch, &mask).context("filtering dataset")?;
        Dataset::new(batch)
    }

    /// The current-year slice.
    pub fn for_year(&self, year: i64) -> Result<Dataset> {
        self.filter_rows(|i| self.year(i) == year)
    }

    /// Full history of one region, ordered by year.
    pub fn for_region(&self, region: &str) -> Result<Dataset> {
        self.filter_rows(|i| self.region(i) == region)?
            .sorted_by(|d, a, b| d.year(a).cmp(&d.year(b)))
    }

    pub fn sorted_by_region_year(&self) -> Result<Dataset> {
        self.sorted_by(|d, a, b| {
            d.region(a)
                .cmp(d.region(b))
                .then_with(|| d.year(a).cmp(&d.year(b)))
        })
    }

    fn sorted_by(
        &self,
        cmp: impl Fn(&Dataset, usize, usize) -> std::cmp::Ordering,
    ) -> Result<Dataset> {
        let mut idx: Vec<usize> = (0..self.num_rows()).collect();
        idx.sort_by(|&a, &b| cmp(self, a, b));
        let indices = UInt32Array::from(idx.into_iter().map(|i| i as u32).collect::<Vec<_>>());
        let batch = take_record_batch(&self.batch, &indices).context("reordering dataset")?;
        Dataset::new(batch)
    }
}

/// Load the primary CSV file. Errors here are fatal for the session: the file
/// is missing, unreadable, lacks a required column, or yields no usable rows.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<LoadedData> {
    let path = path.as_ref();
    if !path.is_file() {
        bail!("data file `{}` not found", path.display());
    }
    let file =
        File::open(path).with_context(|| format!("failed to open data file {:?}", path))?;
    let loaded =
        parse_csv(file).with_context(|| format!("failed to process data file {:?}", path))?;

    if loaded.dataset.is_empty() {
        bail!("data file `{}` produced an empty dataset", path.display());
    }

    info!(
        rows = loaded.dataset.num_rows(),
        dropped = loaded.report.dropped.len(),
        missing_columns = loaded.report.missing_columns.len(),
        "dataset loaded"
    );
    Ok(loaded)
}

/// Parse comma-delimited text with a header row into a typed dataset plus a
/// report of what was dropped or could not be derived.
pub fn parse_csv<R: Read>(mut reader: R) -> Result<LoadedData> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).context("reading CSV input")?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    let headers = read_headers(body)?;
    if headers.iter().all(|h| h.is_empty()) {
        bail!("input has no header row");
    }
    for required in [COL_YEAR, COL_REGION, COL_POPULATION] {
        if !headers.iter().any(|h| h == required) {
            bail!("required column `{}` not found in header", required);
        }
    }

    let raw = read_raw_batch(body, &headers)?;
    debug!(rows = raw.num_rows(), columns = raw.num_columns(), "raw CSV batch read");

    let (keep, dropped) = select_rows(&raw)?;
    let indices = UInt32Array::from(keep);
    let kept = take_record_batch(&raw, &indices).context("selecting valid rows")?;

    let (batch, missing_columns) = build_typed_batch(&kept, &headers)?;
    Ok(LoadedData {
        dataset: Dataset::new(batch)?,
        report: LoadReport {
            dropped,
            missing_columns,
        },
    })
}

/// Header names through the CSV tokenizer, so quoted names may hold commas.
fn read_headers(body: &[u8]) -> Result<Vec<String>> {
    let (schema, _) = Format::default()
        .with_header(true)
        .with_delimiter(b',')
        .with_quote(b'"')
        .infer_schema(body, Some(0))
        .context("reading header row")?;
    Ok(schema.fields().iter().map(|f| clean_str(f.name())).collect())
}

/// Read every cell as nullable Utf8 so coercion decisions stay ours.
/// Short rows are padded with nulls and judged by the row rules.
fn read_raw_batch(body: &[u8], headers: &[String]) -> Result<RecordBatch> {
    let fields: Vec<Field> = headers
        .iter()
        .map(|n| Field::new(n, DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let csv_reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .with_quote(b'"')
        .with_delimiter(b',')
        .with_truncated_rows(true)
        .build(body)
        .context("creating CSV reader")?;

    let batches = csv_reader
        .collect::<Result<Vec<_>, _>>()
        .context("reading CSV records")?;
    concat_batches(&schema, &batches).context("concatenating CSV batches")
}

fn utf8_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("column `{}` missing from raw batch", name))
}

fn parse_year(raw: &str) -> Option<i64> {
    let cleaned = clean_str(raw);
    if let Ok(y) = cleaned.parse::<i64>() {
        return Some(y);
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0)
        .map(|v| v as i64)
}

/// Decide which raw rows survive: region present, year integral, population
/// numeric and positive, and first occurrence of its (region, year) key.
fn select_rows(raw: &RecordBatch) -> Result<(Vec<u32>, Vec<DroppedRow>)> {
    let regions = utf8_column(raw, COL_REGION)?;
    let years = utf8_column(raw, COL_YEAR)?;
    let populations = utf8_column(raw, COL_POPULATION)?;

    let mut keep = Vec::with_capacity(raw.num_rows());
    let mut dropped = Vec::new();
    let mut seen: HashSet<(String, i64)> = HashSet::new();

    for i in 0..raw.num_rows() {
        let region = regions
            .is_valid(i)
            .then(|| clean_str(regions.value(i)))
            .filter(|r| !r.is_empty());
        let raw_year = years.is_valid(i).then(|| years.value(i)).unwrap_or("");
        let raw_pop = populations
            .is_valid(i)
            .then(|| populations.value(i))
            .unwrap_or("");

        let reason = match (&region, parse_year(raw_year), parse_number(raw_pop)) {
            (None, _, _) => Some(DropReason::MissingRegion),
            (_, None, _) => Some(DropReason::InvalidYear {
                raw: clean_str(raw_year),
            }),
            (_, _, None) => Some(DropReason::InvalidPopulation {
                raw: clean_str(raw_pop),
            }),
            (_, _, Some(p)) if p <= 0.0 => Some(DropReason::NonPositivePopulation { value: p }),
            (Some(r), Some(y), Some(_)) => {
                if seen.insert((r.clone(), y)) {
                    None
                } else {
                    Some(DropReason::DuplicateKey)
                }
            }
        };

        match reason {
            None => keep.push(i as u32),
            Some(reason) => {
                let line = i + 2;
                warn!(line, region = ?region, %reason, "dropping row");
                dropped.push(DroppedRow {
                    line,
                    region,
                    reason,
                });
            }
        }
    }

    Ok((keep, dropped))
}

/// Convert the kept Utf8 rows to their final types and append derived rates.
fn build_typed_batch(kept: &RecordBatch, headers: &[String]) -> Result<(RecordBatch, Vec<String>)> {
    let mut fields: Vec<Field> = Vec::with_capacity(headers.len() + RATE_SOURCES.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(headers.len() + RATE_SOURCES.len());

    for (idx, name) in headers.iter().enumerate() {
        let sarr = kept
            .column(idx)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| anyhow!("raw column `{}` is not text", name))?;

        let (dtype, col): (DataType, ArrayRef) = match name.as_str() {
            COL_REGION => {
                let cleaned: StringArray = sarr.iter().map(|v| v.map(clean_str)).collect();
                (DataType::Utf8, Arc::new(cleaned))
            }
            COL_YEAR => {
                let parsed: Int64Array = sarr.iter().map(|v| v.and_then(parse_year)).collect();
                (DataType::Int64, Arc::new(parsed))
            }
            _ => match infer_column_dtype(sarr.iter()) {
                DataType::Float64 => {
                    let mut b = Float64Builder::with_capacity(sarr.len());
                    for v in sarr.iter() {
                        b.append_option(v.and_then(parse_number));
                    }
                    (DataType::Float64, Arc::new(b.finish()))
                }
                _ => {
                    let cleaned: StringArray = sarr
                        .iter()
                        .map(|v| v.map(clean_str).filter(|s| !s.is_empty()))
                        .collect();
                    (DataType::Utf8, Arc::new(cleaned))
                }
            },
        };

        let nullable = !matches!(name.as_str(), COL_REGION | COL_YEAR);
        fields.push(Field::new(name, dtype, nullable));
        columns.push(col);
    }

    let population = kept
        .column_by_name(COL_POPULATION)
        .map(coerce_numeric)
        .ok_or_else(|| anyhow!("column `{}` missing", COL_POPULATION))?;

    let mut missing = Vec::new();
    for (source, rate_name) in RATE_SOURCES {
        let Some(counts) = kept.column_by_name(source).map(coerce_numeric) else {
            warn!(column = source, "count column not found; rate not derived");
            missing.push(source.to_string());
            continue;
        };
        let rates = Float64Array::from(per_100k(&counts, &population));
        let rate_col: ArrayRef = Arc::new(rates);

        // A rate column already present in the input is recomputed in place.
        if let Some(pos) = fields.iter().position(|f| f.name() == rate_name) {
            fields[pos] = Field::new(rate_name, DataType::Float64, true);
            columns[pos] = rate_col;
        } else {
            fields.push(Field::new(rate_name, DataType::Float64, true));
            columns.push(rate_col);
        }
    }

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("building typed record batch")?;
    Ok((batch, missing))
}

/// `round(count / (population / 100000), 2)`, missing when either side is
/// missing, population is not positive, or the quotient is not finite.
pub fn per_100k(counts: &[Option<f64>], population: &[Option<f64>]) -> Vec<Option<f64>> {
    counts
        .iter()
        .zip(population)
        .map(|(count, pop)| match (count, pop) {
            (Some(c), Some(p)) if *p > 0.0 => {
                let rate = c / (p / 100_000.0);
                rate.is_finite().then(|| round2(rate))
            }
            _ => None,
        })
        .collect()
}
