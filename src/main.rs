//! timecorr - correlation-over-time analysis runner
//!
//! Loads the configured datasets, cleans them, precomputes the per-division
//! merge and regression cache, and reports the trend series.

use std::env;
use std::path::Path;

use anyhow::Context;

use timecorr::config::AnalysisConfig;
use timecorr::data::format_magnitude;
use timecorr::pipeline::Analyzer;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Single optional argument: a JSON config path. Defaults to the
    // built-in gapminder study.
    let config = match env::args().nth(1) {
        Some(path) => AnalysisConfig::from_file(Path::new(&path))
            .with_context(|| format!("loading config {path}"))?,
        None => AnalysisConfig::default(),
    };

    let sources = config.load_sources().context("loading source tables")?;

    let mut analyzer = Analyzer::new(
        sources,
        config.key_column.as_str(),
        config.divisions.start,
        config.divisions.stop,
    );

    let extra_x_recipe = config.extra_x.as_ref().and_then(|c| c.cleaning_recipe());
    let extra_y_recipe = config.extra_y.as_ref().and_then(|c| c.cleaning_recipe());
    analyzer
        .clean_sources(extra_x_recipe.as_ref(), extra_y_recipe.as_ref())
        .context("cleaning source tables")?;

    analyzer.precompute().context("precomputing divisions")?;

    let (start, stop) = analyzer.division_range();
    println!(
        "{} vs {} over divisions {start}..={stop}",
        config.axis_y.short_name, config.axis_x.short_name
    );

    let series = analyzer.series();
    for (i, division) in (start..=stop).enumerate() {
        let rows = analyzer
            .division(division)
            .and_then(|td| td.merged())
            .map(|df| df.height())
            .unwrap_or(0);
        println!(
            "{division}: {rows:>4} keys, corr(log x) {:+.4} (p {:.3e}), corr(lin x) {:+.4} (p {:.3e})",
            series.corr_log[i], series.pvalue_log[i], series.corr_lin[i], series.pvalue_lin[i],
        );
    }

    if let Some(td) = analyzer.division(stop) {
        if let Some(merged) = td.merged() {
            println!(
                "\nfinal division {stop}: {} keys merged (size column sum {})",
                merged.height(),
                merged
                    .get_columns()
                    .get(3)
                    .and_then(|c| c.f64().ok())
                    .map(|ca| format_magnitude(ca.into_iter().flatten().sum::<f64>()))
                    .unwrap_or_else(|| "n/a".to_string()),
            );
        }
    }

    Ok(())
}
