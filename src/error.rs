//! Command Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("failed to open the version store")]
    Database,
    #[display("failed to query the version store")]
    Query,
    #[display("failed to open input: {}", _0.display())]
    Input(#[error(not(source))] PathBuf),
    #[display("failed to read input")]
    Read,
    #[display("failed to open output: {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
    #[display("failed to write output")]
    Write,
}
