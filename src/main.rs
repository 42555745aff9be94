use anyhow::{anyhow, bail, Context, Result};
use futures_util::future::join_all;
use serde_json::json;
use std::path::Path;

use promisetrack::client::{ApiClient, FetchState, PromiseSource};
use promisetrack::config::{now_ts, Config};
use promisetrack::dataset::StatDataset;
use promisetrack::logging::{log, log_derivation, log_page, obj, v_str, Domain, Level, ProfileScope};
use promisetrack::promise::engine::{apply, FilterState};
use promisetrack::promise::timeline::build_timeline;
use promisetrack::promise::{is_overdue, minister_name, name_initials, progress_label, PromiseRecord};
use promisetrack::series::labels::{month_label, quarter_label};
use promisetrack::series::window::{ANNUAL_WINDOW, QUARTERLY_YOY_LAG};
use promisetrack::series::{per_capita, ratio_exact, trailing_sum, yoy_growth, TimeSeriesPoint};

const USAGE: &str = "usage:
  promisetrack departments
  promisetrack promises <slug> [--progress all|complete|in_progress|not_started]
                               [--impact all|high|medium|low]
                               [--alignment all|aligned|neutral|not_aligned]
                               [--sort default|last_updated] [--page N]
  promisetrack timeline <promise-id>
  promisetrack per-capita <metric.json> <metric> <population.json> <region> [multiplier]
  promisetrack ratio <numerator.json> <metric> <denominator.json> <series> [multiplier]
  promisetrack trailing <dataset.json> <metric> [window]
  promisetrack growth <dataset.json> <metric> [lag]";

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn positional(args: &[String], idx: usize, what: &str) -> Result<String> {
    args.get(idx)
        .cloned()
        .ok_or_else(|| anyhow!("missing {}\n{}", what, USAGE))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_series(path: &str, metric: &str) -> Result<Vec<TimeSeriesPoint>> {
    let dataset = StatDataset::load(Path::new(path))?;
    dataset
        .series(metric)
        .ok_or_else(|| anyhow!("metric {:?} not in {} (have {:?})", metric, path, dataset.metric_names()))
}

fn filter_state_from_args(args: &[String], cfg: &Config) -> Result<FilterState> {
    let mut state = FilterState::with_policy(cfg.page_policy);
    if let Some(v) = flag(args, "--progress") {
        state.set_progress(v.parse()?);
    }
    if let Some(v) = flag(args, "--impact") {
        state.set_impact(v.parse()?);
    }
    if let Some(v) = flag(args, "--alignment") {
        state.set_alignment(v.parse()?);
    }
    if let Some(v) = flag(args, "--sort") {
        state.set_sort_by(v.parse()?);
    }
    if let Some(v) = flag(args, "--page") {
        state.set_page(v.parse().with_context(|| format!("--page {:?} is not a number", v))?);
    }
    Ok(state)
}

fn promise_card(record: &PromiseRecord, overdue: bool) -> serde_json::Value {
    json!({
        "id": record.id,
        "title": record.concise_title,
        "progress": record.progress(),
        "progress_label": progress_label(record.progress()),
        "impact": record.impact().label(),
        "alignment": record.direction().label(),
        "last_evidence_date": record.last_evidence_date,
        "overdue": overdue,
    })
}

async fn cmd_departments(client: &ApiClient) -> Result<bool> {
    let listings = match client.departments().await {
        Ok(l) => l,
        Err(err) => {
            print_json(&serde_json::to_value(FetchState::<()>::from_result(Err(err)))?)?;
            return Ok(false);
        }
    };
    let details = join_all(listings.iter().map(|d| client.department(&d.slug))).await;
    let rows: Vec<serde_json::Value> = listings
        .iter()
        .zip(details)
        .map(|(listing, detail)| match detail {
            Ok(dept) => json!({
                "slug": listing.slug,
                "name": listing.display_name,
                "minister": minister_name(dept.minister.as_ref()),
                "promises": dept.promises.len(),
            }),
            Err(err) => json!({
                "slug": listing.slug,
                "name": listing.display_name,
                "error": format!("{:#}", err),
            }),
        })
        .collect();
    print_json(&json!({ "departments": rows }))?;
    Ok(true)
}

async fn cmd_promises(client: &ApiClient, cfg: &Config, args: &[String]) -> Result<bool> {
    let slug = positional(args, 0, "department slug")?;
    let state = filter_state_from_args(args, cfg)?;
    let department = match client.department(&slug).await {
        Ok(d) => d,
        Err(err) => {
            print_json(&serde_json::to_value(FetchState::<()>::from_result(Err(err)))?)?;
            return Ok(false);
        }
    };

    let page = {
        let _scope = ProfileScope::with_context("filter_and_sort", &[("slug", v_str(&slug))]);
        apply(&department.promises, &state, cfg.page_size)
    };
    log_page(&slug, page.total, page.page, page.total_pages);

    let overdue = is_overdue(now_ts() as i64);
    let cards: Vec<serde_json::Value> = page.items.iter().map(|r| promise_card(r, overdue)).collect();
    let minister = minister_name(department.minister.as_ref());
    let initials = name_initials(&minister);
    print_json(&json!({
        "department": department.display_name,
        "minister": minister,
        "minister_initials": initials,
        "filters": state,
        "total": page.total,
        "page": page.page,
        "total_pages": page.total_pages,
        "promises": cards,
    }))?;
    Ok(true)
}

async fn cmd_timeline(client: &ApiClient, args: &[String]) -> Result<bool> {
    let id: i64 = positional(args, 0, "promise id")?
        .parse()
        .context("promise id must be an integer")?;
    match client.promise(id).await {
        Ok(detail) => {
            print_json(&serde_json::to_value(build_timeline(&detail))?)?;
            Ok(true)
        }
        Err(err) => {
            print_json(&serde_json::to_value(FetchState::<()>::from_result(Err(err)))?)?;
            Ok(false)
        }
    }
}

fn cmd_per_capita(args: &[String]) -> Result<()> {
    let metric_file = positional(args, 0, "metric dataset")?;
    let metric = positional(args, 1, "metric name")?;
    let population_file = positional(args, 2, "population dataset")?;
    let region = positional(args, 3, "population region")?;
    let multiplier: f64 = match args.get(4) {
        Some(v) => v.parse().with_context(|| format!("multiplier {:?} is not a number", v))?,
        None => 1.0,
    };

    let metric_series = load_series(&metric_file, &metric)?;
    let population = load_series(&population_file, &region)?;
    let out = per_capita(&metric_series, &population, multiplier);
    log_derivation(&metric, "per_capita", metric_series.len(), out.len());

    print_json(&json!({
        "metric": metric,
        "multiplier": multiplier,
        "labels": out.iter().map(|p| quarter_label(&p.date)).collect::<Vec<_>>(),
        "points": out,
    }))
}

fn cmd_ratio(args: &[String]) -> Result<()> {
    let numerator_file = positional(args, 0, "numerator dataset")?;
    let numerator = positional(args, 1, "numerator metric")?;
    let denominator_file = positional(args, 2, "denominator dataset")?;
    let denominator = positional(args, 3, "denominator series")?;
    let multiplier: f64 = match args.get(4) {
        Some(v) => v.parse().with_context(|| format!("multiplier {:?} is not a number", v))?,
        None => 100.0,
    };

    let num = load_series(&numerator_file, &numerator)?;
    let den = load_series(&denominator_file, &denominator)?;
    let out = ratio_exact(&num, &den, multiplier);
    log_derivation(&numerator, "ratio_exact", num.len(), out.len());

    print_json(&json!({
        "metric": numerator,
        "denominator": denominator,
        "multiplier": multiplier,
        "points": out,
    }))
}

fn cmd_trailing(args: &[String]) -> Result<()> {
    let file = positional(args, 0, "dataset")?;
    let metric = positional(args, 1, "metric name")?;
    let window: usize = match args.get(2) {
        Some(v) => v.parse().with_context(|| format!("window {:?} is not a number", v))?,
        None => ANNUAL_WINDOW,
    };
    if window == 0 {
        bail!("window must be at least 1");
    }

    let series = load_series(&file, &metric)?;
    let out = trailing_sum(&series, window);
    log_derivation(&metric, "trailing_sum", series.len(), out.len());

    print_json(&json!({
        "metric": metric,
        "window": window,
        "labels": out.iter().map(|p| month_label(&p.date)).collect::<Vec<_>>(),
        "points": out,
    }))
}

fn cmd_growth(args: &[String]) -> Result<()> {
    let file = positional(args, 0, "dataset")?;
    let metric = positional(args, 1, "metric name")?;
    let lag: usize = match args.get(2) {
        Some(v) => v.parse().with_context(|| format!("lag {:?} is not a number", v))?,
        None => QUARTERLY_YOY_LAG,
    };

    let series = load_series(&file, &metric)?;
    let growth = yoy_growth(&series, lag);
    let labels: Vec<String> = growth.iter().map(|p| quarter_label(&p.date)).collect();
    log_derivation(&metric, "yoy_growth", series.len(), growth.len());

    print_json(&json!({
        "metric": metric,
        "lag": lag,
        "labels": labels,
        "growth": growth,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().cloned() else {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    };
    let rest = &args[1..];

    log(
        Level::Debug,
        Domain::System,
        "startup",
        obj(&[("command", v_str(&command)), ("api_base", v_str(&cfg.api_base))]),
    );

    let ok = match command.as_str() {
        "departments" => cmd_departments(&ApiClient::from_config(&cfg)?).await?,
        "promises" => cmd_promises(&ApiClient::from_config(&cfg)?, &cfg, rest).await?,
        "timeline" => cmd_timeline(&ApiClient::from_config(&cfg)?, rest).await?,
        "per-capita" => cmd_per_capita(rest).map(|_| true)?,
        "ratio" => cmd_ratio(rest).map(|_| true)?,
        "trailing" => cmd_trailing(rest).map(|_| true)?,
        "growth" => cmd_growth(rest).map(|_| true)?,
        other => {
            eprintln!("unknown command {:?}\n{}", other, USAGE);
            std::process::exit(1);
        }
    };

    if !ok {
        // The "unable to load" state has already been printed.
        std::process::exit(2);
    }
    Ok(())
}
