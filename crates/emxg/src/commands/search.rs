//! `emxg search`: run a query and render the result table.

use std::time::Duration;

use indicatif::ProgressBar;
use tracing::{debug, info};

use emxg_core::{DEFAULT_KEYWORD, Screener, SearchQuery, SearchReport};

use crate::cli::{GlobalOpts, SearchArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

fn build_query(args: &SearchArgs) -> SearchQuery {
    let keyword = args.keyword.as_deref().unwrap_or(DEFAULT_KEYWORD);
    let mut query = SearchQuery::new(keyword);
    if let Some(n) = args.max_count {
        query = query.max_count(n);
    }
    if let Some(n) = args.max_page {
        query = query.max_page(n);
    }
    if let Some(n) = args.page_size {
        query = query.page_size(n);
    }
    query
}

fn spinner(keyword: &str, quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("searching {keyword}"));
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn summarize(report: &SearchReport, global: &GlobalOpts) {
    let color = output::should_color(global.color);
    if report.stop.is_partial() {
        output::warning(
            &format!("results are incomplete: {}", report.stop),
            color,
        );
    }
    for issue in &report.issues {
        debug!(
            column = %issue.column,
            row = issue.row,
            value = %issue.value,
            kind = ?issue.kind,
            "value left unconverted"
        );
    }
    if !global.quiet {
        output::status(
            &format!(
                "found {} rows ({} reported, {} pages)",
                report.table.len(),
                report.total,
                report.pages
            ),
            color,
        );
    }
}

pub async fn handle(args: SearchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let query = build_query(&args);
    info!(keyword = %query.keyword, endpoint = %resolved.screener.endpoint, "starting search");

    let mut screener = Screener::new(&resolved.screener)?;

    let progress = spinner(&query.keyword, global.quiet);
    let result = screener.search(&query).await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let report = result?;

    if report.table.is_empty() {
        return Err(CliError::NoResults {
            keyword: query.keyword,
        });
    }
    summarize(&report, global);

    let rendered = output::render_frame(resolved.output, &report.table)?;
    output::print_output(&rendered, global.quiet);

    if let Some(ref path) = args.out_file {
        output::save_csv(&report.table, path)?;
        if !global.quiet {
            eprintln!("saved {} rows to {}", report.table.len(), path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::{Cli, Command};

    fn args(argv: &[&str]) -> SearchArgs {
        let mut full = vec!["emxg", "search"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Search(args) => args,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn keyword_defaults_to_limit_up() {
        let query = build_query(&args(&[]));
        assert_eq!(query.keyword, DEFAULT_KEYWORD);
        assert_eq!(query.max_count, None);
    }

    #[test]
    fn bounds_flow_into_query() {
        let query = build_query(&args(&[
            "涨停板首板",
            "-n",
            "10",
            "--max-page",
            "2",
            "--page-size",
            "20",
        ]));
        assert_eq!(query.keyword, "涨停板首板");
        assert_eq!(query.max_count, Some(10));
        assert_eq!(query.max_page, Some(2));
        assert_eq!(query.page_size, Some(20));
    }

    #[test]
    fn zero_page_size_is_a_usage_error() {
        let err = Cli::try_parse_from(["emxg", "search", "--page-size", "0"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
