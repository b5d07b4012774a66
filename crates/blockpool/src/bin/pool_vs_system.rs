//! # Pool vs. System Allocator
//!
//! Allocates N two-integer records from a block pool, then N boxed records
//! through the system allocator, and prints the time each took.
//!
//! Run with: `cargo run --release --bin pool_vs_system -- [count]`

use blockpool::{run_pool, run_system, RunReport};

/// Default number of records, matching the classic one-million-object run.
const DEFAULT_COUNT: usize = 1_000_000;

fn print_report(report: &RunReport) {
    println!(
        "{:<12} {:>10} allocations  {:>6} ms",
        report.label,
        report.succeeded,
        report.millis()
    );
    if let Some(i) = report.first_failure {
        println!("{:<12} out of memory at i = {}", report.label, i);
    }
}

fn main() {
    let count = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<usize>() {
            Ok(n) => n,
            Err(e) => {
                eprintln!("invalid count {arg:?}: {e}");
                std::process::exit(2);
            }
        },
        None => DEFAULT_COUNT,
    };

    println!("Timing {count} allocations of {} bytes", std::mem::size_of::<blockpool::Record>());
    println!();

    match run_pool(count) {
        Ok(report) => print_report(&report),
        Err(e) => {
            eprintln!("block pool failed: {e}");
            std::process::exit(1);
        }
    }

    print_report(&run_system(count));
}
