mod args;
mod convert;

use crate::args::CliArguments;
use clap::Parser;
use std::{
    io::{self, Write},
    process,
};

fn main() {
    if let Err(msg) = run() {
        print_error(&msg).unwrap();
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = CliArguments::parse();
    convert::convert(&args)
}

fn print_error(msg: &str) -> io::Result<()> {
    use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

    let mut w = StandardStream::stderr(ColorChoice::Always);

    let mut color = ColorSpec::new();
    color.set_fg(Some(Color::Red));
    color.set_bold(true);
    w.set_color(&color)?;
    write!(w, "error")?;

    w.reset()?;
    writeln!(w, ": {msg}.")
}
