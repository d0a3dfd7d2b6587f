use std::sync::Arc;

use anyhow::bail;
use colored::Colorize;
use serde_json::{json, Value};
use sqs_access::AccessLogic;
use sqs_resolve::{ResolveReport, ResolveRequest, ResolverConfig, StreamQueryResolver};
use sqs_store::DescendantLookup;
use sqs_types::{ClauseBranch, ResolvedQuery, StreamId};

use crate::cli::*;
use crate::fixture::Fixture;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Resolve(args) => cmd_resolve(args, &cli.format),
        Command::CheckConfig(args) => cmd_check_config(args),
    }
}

fn cmd_resolve(args: ResolveArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let fixture = Fixture::load(&args.fixture)?;
    let registry = fixture.registry()?;
    tracing::debug!(stores = ?registry.store_ids(), access = %fixture.access.id, "fixture loaded");
    let lookup: Arc<dyn DescendantLookup> = Arc::new(registry);
    let config = fixture.resolver;
    let caller = AccessLogic::new(fixture.access, &config.conventions, lookup.clone())?;
    let resolver = StreamQueryResolver::new(config, lookup)?;

    // The parameter arrives as a query-string value: JSON text or a bare id.
    let request = ResolveRequest::new(args.query.map(Value::String))
        .with_state(args.state.into())
        .with_legacy(args.legacy);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = match runtime.block_on(resolver.resolve(&request, &caller)) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{} {}", "✗".red().bold(), err.to_string().red());
            bail!("{}: {}", err.id(), err);
        }
    };

    let query = if args.legacy {
        resolver.to_legacy(&report.query)
    } else {
        report.query.clone()
    };
    match format {
        OutputFormat::Json => {
            let value = report_json(&query, &report);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => print_report(&query, &report),
    }
    Ok(())
}

fn report_json(query: &ResolvedQuery, report: &ResolveReport) -> Value {
    let stages: Vec<Value> = report
        .stages
        .iter()
        .map(|s| json!({ "stage": s.stage_name, "micros": s.elapsed.as_micros() as u64 }))
        .collect();
    let predicates: serde_json::Map<String, Value> = report
        .predicates()
        .into_iter()
        .map(|(store, predicate)| (store.to_string(), json!(predicate.to_string())))
        .collect();
    json!({
        "query": query,
        "predicates": predicates,
        "stages": stages,
    })
}

fn print_report(query: &ResolvedQuery, report: &ResolveReport) {
    if query.is_empty() {
        println!("{} Resolved to an empty scope: nothing is readable.", "✓".green().bold());
    } else {
        println!("{} Resolved {} clause(s)", "✓".green().bold(), query.len().to_string().bold());
    }

    for (i, clause) in query.clauses.iter().enumerate() {
        println!("  [{}] store {}", i, clause.store_id.to_string().cyan());
        if let Some(any) = &clause.any {
            println!("      any: {}", join(any).yellow());
        }
        for branch in &clause.and {
            match branch {
                ClauseBranch::Any(ids) => println!("      and any: {}", join(ids).yellow()),
                ClauseBranch::Not(ids) => println!("      and not: {}", join(ids).red()),
            }
        }
    }

    let predicates = report.predicates();
    if !predicates.is_empty() {
        println!("\nPredicates:");
        for (store, predicate) in &predicates {
            println!("  {}: {}", store.to_string().cyan(), predicate);
        }
    }

    println!("\nStages:");
    for stage in &report.stages {
        println!("  {:<12} {:>8?}", stage.stage_name, stage.elapsed);
    }
    println!("  {:<12} {:>8?}", "total".bold(), report.elapsed);
}

fn join(ids: &[StreamId]) -> String {
    ids.iter().map(StreamId::as_str).collect::<Vec<_>>().join(", ")
}

fn cmd_check_config(args: CheckConfigArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.path)?;
    let config = ResolverConfig::from_toml_str(&text)?;
    let clauses = config.default_clauses()?;
    println!(
        "{} Configuration {} is valid",
        "✓".green().bold(),
        args.path.display().to_string().bold()
    );
    println!("  Default store: {}", config.conventions.default_store().to_string().cyan());
    println!("  Default query: {} clause(s)", clauses.len());
    println!("  Timeout: {:?}", config.timeout);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::*;
    use crate::cli::StateArg;

    const FIXTURE: &str = r#"
        [access]
        id = "diary-app"

        [[access.permissions]]
        streamId = "diary"
        level = "read"

        [[stores.local.streams]]
        id = "diary"

        [[stores.local.streams]]
        id = "travel"
        parentId = "diary"

        [[stores.local.streams]]
        id = "work"
    "#;

    fn fixture_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        file
    }

    fn args(fixture: PathBuf, query: Option<&str>) -> ResolveArgs {
        ResolveArgs {
            fixture,
            query: query.map(str::to_string),
            state: StateArg::Default,
            legacy: false,
        }
    }

    // -----------------------------------------------------------------------
    // 1. Resolve succeeds in both output formats
    // -----------------------------------------------------------------------
    #[test]
    fn resolve_readable_stream() {
        let file = fixture_file();
        cmd_resolve(args(file.path().into(), Some("diary")), &OutputFormat::Text).unwrap();
        cmd_resolve(args(file.path().into(), None), &OutputFormat::Json).unwrap();
    }

    // -----------------------------------------------------------------------
    // 2. Errors carry their identifier
    // -----------------------------------------------------------------------
    #[test]
    fn resolve_forbidden_stream_fails() {
        let file = fixture_file();
        let err = cmd_resolve(args(file.path().into(), Some("work")), &OutputFormat::Text)
            .unwrap_err();
        assert!(err.to_string().starts_with("forbidden:"));
    }

    // -----------------------------------------------------------------------
    // 3. JSON report shape
    // -----------------------------------------------------------------------
    #[test]
    fn json_report_lists_predicates_and_stages() {
        let file = fixture_file();
        let fixture = Fixture::load(file.path()).unwrap();
        let lookup: Arc<dyn DescendantLookup> = Arc::new(fixture.registry().unwrap());
        let caller = AccessLogic::new(
            fixture.access,
            &fixture.resolver.conventions,
            lookup.clone(),
        )
        .unwrap();
        let resolver = StreamQueryResolver::new(fixture.resolver, lookup).unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let report = runtime
            .block_on(resolver.resolve(&ResolveRequest::default(), &caller))
            .unwrap();

        let value = report_json(&report.query, &report);
        assert_eq!(value["predicates"]["local"], "streamIds IN (diary, travel)");
        assert_eq!(value["stages"].as_array().unwrap().len(), 5);
        assert_eq!(value["query"][0]["storeId"], "local");
    }

    // -----------------------------------------------------------------------
    // 4. check-config
    // -----------------------------------------------------------------------
    #[test]
    fn check_config_accepts_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"param_name = \"scope\"\n").unwrap();
        cmd_check_config(CheckConfigArgs { path: file.path().into() }).unwrap();
    }

    #[test]
    fn check_config_rejects_empty_default_query() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"default_query = []\n").unwrap();
        assert!(cmd_check_config(CheckConfigArgs { path: file.path().into() }).is_err());
    }
}
