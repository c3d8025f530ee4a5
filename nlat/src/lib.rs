use colored::Colorize;
use log::LevelFilter;
use statistical::{mean, median, standard_deviation};
use std::io::Write;

pub mod args;
pub mod error;
pub mod fs;
pub mod handle;
#[cfg(feature = "nfs")]
pub mod nfs;
pub mod poll;
pub mod record;
pub mod report;
pub mod sampler;
pub mod url;
pub mod window;

/// Print statistics over the reported window means of one metric.
pub fn summary(metric: &str, mut means_ms: Vec<f64>) {
    if means_ms.is_empty() {
        return;
    }
    println!("=> {metric} summary over {} windows", means_ms.len());

    let mu = mean(&means_ms);
    let med = median(&means_ms);
    let sd = if means_ms.len() > 1 {
        standard_deviation(&means_ms, Some(mu))
    } else {
        0.0
    };

    means_ms.sort_by(|a, b| a.total_cmp(b));

    println!("mean   : {mu:.4} ms");
    println!("median : {med:.4} ms");
    println!("stdev  : {sd:.4} ms");
    println!(
        "min/max: {:.4} / {:.4} ms",
        means_ms[0],
        means_ms[means_ms.len() - 1]
    );
}

/// Set up `env_logger` with a colored level prefix, `RUST_LOG` still overrides the filter.
pub fn init_logger(verbose: bool) {
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{}: {}",
                record.level().to_string().blue(),
                record.args()
            )
        })
        .filter(
            None,
            if verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
        )
        .parse_env("RUST_LOG")
        .init();
}
