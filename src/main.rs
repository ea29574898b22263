use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use sales_lens::clean::OutlierOutcome;
use sales_lens::report::{self, MonthlyCategoryCounts};
use sales_lens::{Config, FilterSpec, MergeStrategy, Session};

/// Merge, clean, and summarise a directory of sales exports
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the .csv / .json / .parquet files
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How to combine files with different columns
    #[arg(long, value_enum)]
    merge: Option<MergeArg>,

    /// Keep only these product categories (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Keep only these customer cities (repeatable)
    #[arg(long = "city")]
    cities: Vec<String>,

    /// Keep only these payment methods (repeatable)
    #[arg(long = "payment")]
    payments: Vec<String>,

    /// Lower bound of the price range
    #[arg(long)]
    min_price: Option<f64>,

    /// Upper bound of the price range
    #[arg(long)]
    max_price: Option<f64>,

    /// Number of cities in the top-cities table
    #[arg(long)]
    top: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MergeArg {
    Auto,
    Concat,
    OuterJoin,
}

impl From<MergeArg> for MergeStrategy {
    fn from(arg: MergeArg) -> Self {
        match arg {
            MergeArg::Auto => MergeStrategy::Auto,
            MergeArg::Concat => MergeStrategy::Concat,
            MergeArg::OuterJoin => MergeStrategy::OuterJoin,
        }
    }
}

impl Args {
    /// Configuration file (or defaults) with command-line overrides applied.
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(merge) = self.merge {
            config.merge_strategy = merge.into();
        }
        if let Some(top) = self.top {
            config.top_cities = top;
        }
        config.validate()?;
        Ok(config)
    }

    fn filter(&self) -> FilterSpec {
        let mut spec = FilterSpec::new()
            .with_categories(self.categories.iter().cloned())
            .with_cities(self.cities.iter().cloned())
            .with_payment_methods(self.payments.iter().cloned());
        if self.min_price.is_some() || self.max_price.is_some() {
            spec = spec.with_price_range(
                self.min_price.unwrap_or(f64::NEG_INFINITY),
                self.max_price.unwrap_or(f64::INFINITY),
            );
        }
        spec
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = args.config()?;
    let mut session = Session::open(&config)?;
    session.set_filter(args.filter());

    print_cleaning_summary(&session);

    let visible = session.visible_table();
    println!(
        "\n{} of {} rows match the filter",
        visible.len(),
        session.table().len()
    );

    match report::monthly_category_counts(&visible) {
        Ok(pivot) => print_monthly(&pivot),
        Err(e) => log::warn!("Monthly category report unavailable: {e}"),
    }
    match report::top_cities(&visible, config.top_cities) {
        Ok(rows) => print_ranked(
            &format!("Top {} cities by orders", config.top_cities),
            "City",
            &rows,
        ),
        Err(e) => log::warn!("Top cities report unavailable: {e}"),
    }
    match report::payment_distribution(&visible) {
        Ok(rows) => print_ranked("Payment methods", "Method", &rows),
        Err(e) => log::warn!("Payment report unavailable: {e}"),
    }

    Ok(())
}

fn print_cleaning_summary(session: &Session) {
    let load = session.load_report();
    let report = session.cleaning_report();

    println!("=== Cleaning summary ===");
    println!(
        "Files loaded: {} ({} skipped), merged with {:?}",
        load.loaded.len(),
        load.skipped.len(),
        load.strategy
    );
    for skipped in &load.skipped {
        println!("  skipped {}: {}", skipped.path.display(), skipped.error);
    }
    println!("Rows in:              {}", report.rows_in);
    println!("Cells imputed:        {}", report.imputation.total_filled());
    if !report.imputation.unfilled.is_empty() {
        println!("Left missing:         {}", report.imputation.unfilled.join(", "));
    }
    println!("Duplicates removed:   {}", report.duplicates_removed);
    for outcome in &report.outliers {
        match outcome {
            OutlierOutcome::Filtered(step) => println!(
                "  {:<28} [{:>10.2}, {:>10.2}]  removed {}",
                step.column, step.lower, step.upper, step.removed
            ),
            OutlierOutcome::Skipped { column, reason } => {
                println!("  {column:<28} skipped ({reason})")
            }
        }
    }
    println!("Rows out:             {}", report.rows_out);
}

fn print_monthly(pivot: &MonthlyCategoryCounts) {
    println!("\n=== Purchases per month ===");
    println!("{:<10} {:>8}  top category", "Month", "Total");
    for (m, month) in pivot.months.iter().enumerate() {
        let top = pivot.counts[m]
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
            .map(|(c, n)| format!("{} ({n})", pivot.categories[c]))
            .unwrap_or_default();
        println!("{month:<10} {:>8}  {top}", pivot.month_total(month));
    }
}

fn print_ranked(title: &str, label: &str, rows: &[(String, usize)]) {
    println!("\n=== {title} ===");
    let width = rows
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0)
        .max(label.len());
    println!("{label:<width$}  {:>8}", "Count");
    for (name, count) in rows {
        println!("{name:<width$}  {count:>8}");
    }
}
