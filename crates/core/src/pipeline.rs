use serde::{Deserialize, Serialize};

use crate::classify::{classify, is_breakdown_page, normalize_percent, RowKind};
use crate::columns::{locate_columns, ColumnBounds};
use crate::config::ExtractConfig;
use crate::rows::{assemble_rows, RawRow};
use crate::token::{page_tokens, RenderedPage, Token};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),
}

/// A document as a sequence of renderable pages.
pub trait PageSource {
    type Page: RenderedPage;

    fn page_count(&self) -> usize;

    /// The page at a 0-based index, or `None` when it cannot be rendered.
    fn page(&self, index: usize) -> Option<Self::Page>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRow {
    pub kind: RowKind,
    pub label: String,
    pub duration: String,
    pub percent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    pub client: String,
}

impl ClassifiedRow {
    fn from_raw(raw: &RawRow, kind: RowKind, label: String) -> Self {
        Self {
            kind,
            label,
            duration: raw.duration_text.trim().to_string(),
            percent: normalize_percent(&raw.percent_text),
            amount: raw.amount_text.as_ref().map(|a| a.trim().to_string()),
            client: raw.client_text.trim().to_string(),
        }
    }
}

/// The reconstructed table: kept rows in page and top-to-bottom order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub has_amount: bool,
    pub rows: Vec<ClassifiedRow>,
}

impl ResultTable {
    pub fn headers(&self) -> Vec<&'static str> {
        if self.has_amount {
            vec!["Project", "Duration", "Duration%", "Amount", "Client"]
        } else {
            vec!["Project", "Duration", "Duration%", "Client"]
        }
    }

    /// Rows as cell strings in header order.
    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut cells = vec![row.label.clone(), row.duration.clone(), row.percent.clone()];
                if self.has_amount {
                    cells.push(row.amount.clone().unwrap_or_else(|| "-".to_string()));
                }
                cells.push(row.client.clone());
                cells
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Rows that name a project, excluding the total and unassigned buckets.
    pub fn project_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.kind == RowKind::Project)
            .count()
    }
}

/// Everything learned about a single page.
#[derive(Debug, Clone, Serialize)]
pub struct PageAnalysis {
    /// 0-based page index.
    pub index: usize,
    pub tokens: Vec<Token>,
    pub is_breakdown: bool,
    pub bounds: Option<ColumnBounds>,
    pub rows: Vec<RawRow>,
    /// Classification of each raw row; `None` for rows with blank labels.
    pub classified: Vec<Option<ClassifiedRow>>,
}

impl PageAnalysis {
    /// Classified rows of every kind, blank labels dropped.
    pub fn classified_rows(&self) -> impl Iterator<Item = &ClassifiedRow> {
        self.classified.iter().flatten()
    }
}

/// Run the page classifier, column locator and row assembler on one page.
pub fn analyze_page<P: RenderedPage>(index: usize, page: &P, config: &ExtractConfig) -> PageAnalysis {
    let tokens = page_tokens(page, config);
    let is_breakdown = is_breakdown_page(&tokens);

    let (bounds, rows) = if is_breakdown {
        let bounds = locate_columns(&tokens, config);
        let rows = bounds
            .as_ref()
            .map(|b| assemble_rows(&tokens, b, config))
            .unwrap_or_default();
        (bounds, rows)
    } else {
        (None, Vec::new())
    };

    let classified = rows
        .iter()
        .map(|raw| classify(&raw.left_text).map(|(kind, label)| ClassifiedRow::from_raw(raw, kind, label)))
        .collect();

    PageAnalysis {
        index,
        tokens,
        is_breakdown,
        bounds,
        rows,
        classified,
    }
}

fn scan_pages<S: PageSource>(source: &S, start: usize, config: &ExtractConfig) -> Vec<ClassifiedRow> {
    let mut rows = Vec::new();

    for index in start..source.page_count() {
        let Some(page) = source.page(index) else {
            continue;
        };
        let analysis = analyze_page(index, &page, config);

        if !analysis.is_breakdown {
            log::debug!("page {}: not a breakdown page", index + 1);
            continue;
        }
        match &analysis.bounds {
            Some(bounds) => log::debug!("page {}: columns {:?}", index + 1, bounds),
            None => log::debug!("page {}: missing duration or percentage anchors", index + 1),
        }

        let before = rows.len();
        rows.extend(analysis.classified_rows().cloned());
        log::debug!("page {}: {} classified rows", index + 1, rows.len() - before);
    }

    rows
}

/// Rebuild the breakdown table from a document's pages.
///
/// Scanning starts at the second page; when that finds nothing the whole
/// document is scanned again from the first page. Member rows are dropped.
/// A document without a table yields an empty result.
pub fn process_pages<S: PageSource>(source: &S, config: &ExtractConfig) -> ResultTable {
    let start = if source.page_count() > 1 { 1 } else { 0 };

    let mut rows = scan_pages(source, start, config);
    if rows.is_empty() && start > 0 {
        log::debug!("no rows after the first page, rescanning from page 1");
        rows = scan_pages(source, 0, config);
    }

    let rows: Vec<ClassifiedRow> = rows.into_iter().filter(|r| r.kind.is_kept()).collect();
    log::info!("extracted {} rows", rows.len());

    ResultTable {
        has_amount: config.amount,
        rows,
    }
}
