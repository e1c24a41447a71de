use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

const USAGE: &str = "usage: pl0c file.pl0";

const HELP: &str = "\
pl0c - compile PL/0 to C

USAGE:
    pl0c FILE.pl0

The generated C is written to standard output. Diagnostics go to standard
error; set RUST_LOG=debug to trace compilation.
";

fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

  let path = match parse_args() {
    Ok(path) => path,
    Err(_) => {
      eprintln!("{USAGE}");
      process::exit(1);
    }
  };

  match pl0c::compile_file(&path) {
    Ok(c) => {
      let mut stdout = io::stdout().lock();
      if let Err(err) = stdout.write_all(c.as_bytes()).and_then(|()| stdout.flush()) {
        eprintln!("pl0c: error: couldn't write output: {err}");
        process::exit(1);
      }
    }
    Err(err) => {
      eprintln!("pl0c: {err}");
      process::exit(1);
    }
  }
}

/// Exactly one free argument, the source path.
fn parse_args() -> Result<PathBuf, pico_args::Error> {
  let mut pargs = pico_args::Arguments::from_env();

  if pargs.contains(["-h", "--help"]) {
    print!("{HELP}");
    process::exit(0);
  }

  let path: PathBuf = pargs.free_from_str()?;
  let remaining = pargs.finish();
  if !remaining.is_empty() {
    return Err(pico_args::Error::ArgumentParsingFailed {
      cause: format!("unused arguments left: {remaining:?}"),
    });
  }
  Ok(path)
}
