pub use crate::error::Error;

pub use anstream::eprintln;
pub use anstream::println;
pub use color_eyre::eyre::{eyre, Context, OptionExt, Result};
pub use std::format as f;

/// A borderless table with one space of padding around each cell.
pub fn new_table() -> prettytable::Table {
    let mut table = prettytable::Table::new();

    let format = prettytable::format::FormatBuilder::new()
        .padding(1, 1)
        .build();

    table.set_format(format);

    table
}

/// A [`new_table`] filled with a header row and string records.
pub fn records_table<H: AsRef<str>>(headers: &[H], records: &[Vec<String>]) -> prettytable::Table {
    let mut table = new_table();
    table.set_titles(prettytable::Row::new(
        headers
            .iter()
            .map(|h| prettytable::Cell::new(h.as_ref()))
            .collect(),
    ));
    for record in records {
        table.add_row(prettytable::Row::new(
            record.iter().map(|c| prettytable::Cell::new(c)).collect(),
        ));
    }
    table
}
