use crate::document::PdfDocument;
use crate::prelude::{println, *};
use breakdown_core::columns::ColumnBounds;
use breakdown_core::config::ExtractConfig;
use breakdown_core::pipeline::{analyze_page, PageAnalysis, PageSource};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, clap::Args, Clone)]
pub struct InspectOptions {
    /// Path to the PDF report
    pub path: PathBuf,

    /// Only inspect this page (1-based)
    #[arg(short, long)]
    pub page: Option<usize>,

    /// List every token with its position
    #[arg(long)]
    pub words: bool,

    /// Locate the amount column too
    #[arg(long, env = "BREAKDOWN_AMOUNT")]
    pub amount: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Analyze the requested pages of a document.
pub fn inspect_data(bytes: &[u8], page: Option<usize>, config: &ExtractConfig) -> Result<Vec<PageAnalysis>> {
    let document = PdfDocument::from_bytes(bytes)?;
    let count = document.page_count();

    let indices: Vec<usize> = match page {
        Some(0) => return Err(eyre!("Pages are numbered from 1")),
        Some(n) if n > count => return Err(eyre!("Page {} out of range (document has {} pages)", n, count)),
        Some(n) => vec![n - 1],
        None => (0..count).collect(),
    };

    Ok(indices
        .into_iter()
        .filter_map(|index| document.page(index).map(|p| analyze_page(index, &p, config)))
        .collect())
}

pub async fn run(options: InspectOptions, global: crate::Global) -> Result<()> {
    let config = crate::config::load_config(global.config.as_deref(), options.amount)?;
    let bytes = std::fs::read(&options.path)
        .wrap_err_with(|| f!("Failed to read {}", options.path.display()))?;

    if global.verbose {
        let meta = pdf::info(&bytes)?;
        println!("Title: {}", meta.title.as_deref().unwrap_or("-"));
        println!("Producer: {}", meta.producer.as_deref().unwrap_or("-"));
        println!("Pages: {}", meta.page_count);
        println!();
    }

    let pages = tokio::task::spawn_blocking({
        let page = options.page;
        move || inspect_data(&bytes, page, &config)
    })
    .await??;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&pages)?);
    } else {
        for analysis in &pages {
            output_formatted(analysis, options.words);
        }
    }

    Ok(())
}

fn bounds_table(bounds: &ColumnBounds) -> prettytable::Table {
    let mut table = new_table();
    table.add_row(prettytable::row!["Left max", f!("{:.1}", bounds.left_max)]);
    table.add_row(prettytable::row!["Duration x0", f!("{:.1}", bounds.duration_x_min)]);
    table.add_row(prettytable::row!["Percent x0", f!("{:.1}", bounds.percent_x_min)]);
    if let Some((min, max)) = bounds.amount {
        table.add_row(prettytable::row!["Amount", f!("{:.1} - {:.1}", min, max)]);
    }
    table.add_row(prettytable::row![
        "Client",
        f!("{:.1} - {:.1}", bounds.client_x_min, bounds.client_x_max)
    ]);
    table
}

fn output_formatted(analysis: &PageAnalysis, words: bool) {
    let verdict = if analysis.is_breakdown {
        "breakdown".green()
    } else {
        "skipped".yellow()
    };
    println!(
        "\n{} {} ({} tokens, {})",
        "Page".bold(),
        analysis.index + 1,
        analysis.tokens.len(),
        verdict
    );

    if words {
        let mut table = new_table();
        table.set_titles(prettytable::row!["Text", "x0", "x1", "Top", "Bottom"]);
        for t in &analysis.tokens {
            table.add_row(prettytable::row![
                t.text,
                f!("{:.1}", t.x0),
                f!("{:.1}", t.x1),
                f!("{:.1}", t.top),
                f!("{:.1}", t.bottom)
            ]);
        }
        table.printstd();
    }

    if !analysis.is_breakdown {
        return;
    }
    let Some(bounds) = &analysis.bounds else {
        println!("{}", "No duration/percentage anchors".yellow());
        return;
    };
    bounds_table(bounds).printstd();

    let mut table = new_table();
    table.set_titles(prettytable::row!["Top", "Kind", "Left", "Duration", "%", "Amount", "Client"]);
    for (raw, classified) in analysis.rows.iter().zip(&analysis.classified) {
        let kind = classified
            .as_ref()
            .map(|c| c.kind.to_string())
            .unwrap_or_else(|| "dropped".to_string());
        table.add_row(prettytable::row![
            f!("{:.1}", raw.top),
            kind,
            raw.left_text,
            raw.duration_text,
            raw.percent_text,
            raw.amount_text.as_deref().unwrap_or(""),
            raw.client_text
        ]);
    }
    table.printstd();
}
