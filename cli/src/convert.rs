use crate::args::CliArguments;
use dwfx2pdf::Options;
use std::path::Path;

/// Execute a conversion command.
pub fn convert(args: &CliArguments) -> Result<(), String> {
    let name = Path::new(
        args.input.file_name().ok_or("Input path does not point to a file")?,
    );
    let output = args.output.clone().unwrap_or_else(|| name.with_extension("pdf"));

    let options = Options { compress: !args.uncompressed };

    dwfx2pdf::convert_with_options(&args.input, &output, options)
        .map_err(|err| err.to_string())
}
