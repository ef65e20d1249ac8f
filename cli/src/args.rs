use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(about, version)]
pub struct CliArguments {
    /// Path to read the DWFx file from.
    pub input: PathBuf,
    /// Path to write the PDF file to. Defaults to the input path with a
    /// `.pdf` extension.
    pub output: Option<PathBuf>,
    /// Write the content streams uncompressed.
    #[clap(long, action = ArgAction::SetTrue)]
    pub uncompressed: bool,
}
