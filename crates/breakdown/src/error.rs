#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("No rows found in {0}")]
    NoRowsFound(String),

    #[error("Invalid output path: {0}")]
    InvalidOutput(String),

    #[error("{0} of {1} documents could not be read")]
    Unreadable(usize, usize),

    #[error("{0} of {1} workbooks could not be written")]
    Unwritten(usize, usize),
}
