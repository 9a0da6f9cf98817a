//! Command-line front end for page-count resolution.
//!
//! Usage:
//!   pdf-page-count <file.pdf>
//!   pdf-page-count --async <file.pdf>
//!
//! Prints the resolved page count to stdout and exits 0 on success. Exits 1
//! on a usage error or I/O failure, 2 when no strategy could resolve a page
//! count (spec.md §6).

use std::path::PathBuf;
use std::process::ExitCode;

use pdf_page_count::{Error, PageCountConfig};

struct CliArgs {
    path: Option<PathBuf>,
    use_async: bool,
    max_stream_size: Option<usize>,
    max_prev_hops: Option<u32>,
}

impl CliArgs {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut path = None;
        let mut use_async = false;
        let mut max_stream_size = None;
        let mut max_prev_hops = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--async" => use_async = true,
                "--max-stream-size" => {
                    i += 1;
                    if i < args.len() {
                        max_stream_size = args[i].parse().ok();
                    }
                },
                "--max-prev-hops" => {
                    i += 1;
                    if i < args.len() {
                        max_prev_hops = args[i].parse().ok();
                    }
                },
                other => path = Some(PathBuf::from(other)),
            }
            i += 1;
        }

        Self {
            path,
            use_async,
            max_stream_size,
            max_prev_hops,
        }
    }

    fn config(&self) -> PageCountConfig {
        let mut cfg = PageCountConfig::default();
        if let Some(n) = self.max_stream_size {
            cfg = cfg.with_max_stream_size(n);
        }
        if let Some(n) = self.max_prev_hops {
            cfg = cfg.with_max_prev_hops(n);
        }
        cfg
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args = CliArgs::from_args();
    let Some(path) = args.path else {
        eprintln!("usage: pdf-page-count [--async] [--max-stream-size N] [--max-prev-hops N] <file.pdf>");
        return ExitCode::from(1);
    };

    let cfg = args.config();

    let result = if args.use_async {
        #[cfg(feature = "async")]
        {
            run_async(&path, &cfg)
        }
        #[cfg(not(feature = "async"))]
        {
            eprintln!("pdf-page-count: built without the \"async\" feature");
            return ExitCode::from(1);
        }
    } else {
        pdf_page_count::count_pages_with_config(&path, &cfg)
    };

    match result {
        Ok(n) => {
            println!("{n}");
            ExitCode::SUCCESS
        },
        Err(Error::PageCountNotFound) => {
            eprintln!("pdf-page-count: could not resolve a page count for {}", path.display());
            ExitCode::from(2)
        },
        Err(e) => {
            eprintln!("pdf-page-count: {e}");
            ExitCode::from(1)
        },
    }
}

#[cfg(feature = "async")]
fn run_async(path: &std::path::Path, cfg: &PageCountConfig) -> pdf_page_count::Result<u64> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .expect("failed to start async runtime");
    runtime.block_on(pdf_page_count::count_pages_async_with_config(path, cfg))
}
