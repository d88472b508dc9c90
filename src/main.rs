use std::io;
use std::process;

use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use lfw::cliopt::CliOpt;
use lfw::error::Result;
use lfw::output::LineFlushingWriter;
use lfw::runner::{open_sink, Runner};

fn main() {
    let opt = match CliOpt::from_iter_safe(std::env::args_os()) {
        Ok(opt) => opt,
        Err(e) if e.use_stderr() => {
            eprintln!("{}", e.message);
            process::exit(2);
        }
        Err(e) => e.exit(),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(opt.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(&opt) {
        eprintln!("lfw: {}", err);
        process::exit(1);
    }
}

fn run(opt: &CliOpt) -> Result<()> {
    let writer = LineFlushingWriter::new(open_sink(opt)?, opt.threshold)?;

    // Runner::run closes the writer, and with it the sink.
    let stdin = io::stdin();
    Runner::new(stdin.lock(), writer, opt.copy_buffer)?.run()?;

    Ok(())
}
