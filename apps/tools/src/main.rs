use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use memory_service::{load_fixture, save_fixture};
use serde_json::Value;
use shared::{
    domain::Record,
    query::{search_filter, Filter, FilterOperator, OperationKind, Sorter},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use view_core::{
    load_settings, BusyIndicator, DataServiceClient, FragmentInstance, RequestDescriptor,
    RequestDescriptorBuilder, RequestOrchestrator, RequestOutcome, TracingNotificationSink,
    ViewHost,
};

#[derive(Parser, Debug)]
#[command(name = "view-tools", about = "Run one data request against a JSON fixture")]
struct Cli {
    /// Fixture file: `{ "Set": { "key": "Field", "records": [...] } }`.
    #[arg(long)]
    fixture: PathBuf,
    /// Persist changes back into the fixture file.
    #[arg(long)]
    write_back: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Read {
        /// `/Orders`, `Orders` or `/Orders(7)`.
        path: String,
        /// `FIELD:OP:VALUE`, or `FIELD:bt:LOW:HIGH`. Repeatable; all must match.
        #[arg(long = "filter")]
        filters: Vec<String>,
        /// `FIELD` or `FIELD:desc`. Repeatable.
        #[arg(long = "sort")]
        sorters: Vec<String>,
        #[arg(long)]
        select: Option<String>,
        #[arg(long)]
        expand: Option<String>,
        #[arg(long)]
        top: Option<u64>,
        #[arg(long)]
        skip: Option<u64>,
    },
    Create {
        path: String,
        /// JSON object.
        #[arg(long)]
        payload: String,
    },
    Update {
        path: String,
        #[arg(long)]
        payload: String,
    },
    Delete {
        path: String,
    },
    /// Case-insensitive substring search over one or more fields.
    Search {
        entity_set: String,
        query: String,
        #[arg(long = "field", required = true)]
        fields: Vec<String>,
    },
}

struct CliView;

impl ViewHost for CliView {
    fn controller_name(&self) -> &str {
        "view-tools"
    }

    fn add_dependent(&self, _fragment: Arc<dyn FragmentInstance>) {}

    fn remove_dependent(&self, _fragment_id: &str) {}
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_filter(raw: &str) -> Result<Filter> {
    let mut parts = raw.splitn(3, ':');
    let (Some(path), Some(operator), Some(rest)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("filter '{raw}' must look like FIELD:OP:VALUE");
    };
    let operator: FilterOperator = operator.parse()?;

    if operator == FilterOperator::Between {
        let (low, high) = rest
            .split_once(':')
            .ok_or_else(|| anyhow!("between filter '{raw}' must look like FIELD:bt:LOW:HIGH"))?;
        return Ok(Filter::between(path, parse_value(low), parse_value(high)));
    }
    Ok(Filter::new(path, operator, parse_value(rest)))
}

fn parse_sorter(raw: &str) -> Result<Sorter> {
    match raw.split_once(':') {
        None => Ok(Sorter::ascending(raw)),
        Some((path, direction)) if direction.eq_ignore_ascii_case("asc") => {
            Ok(Sorter::ascending(path))
        }
        Some((path, direction)) if direction.eq_ignore_ascii_case("desc") => {
            Ok(Sorter::descending(path))
        }
        Some((_, direction)) => bail!("unknown sort direction '{direction}' in '{raw}'"),
    }
}

fn parse_payload(raw: &str) -> Result<Record> {
    serde_json::from_str(raw).with_context(|| format!("payload is not valid JSON: {raw}"))
}

fn print_record(record: &Record) {
    match serde_json::to_string_pretty(record) {
        Ok(json) => println!("{json}"),
        Err(err) => error!("failed to render result: {err}"),
    }
}

/// Returns the descriptor and the operation to run for a subcommand.
fn describe(
    command: Command,
    builder: RequestDescriptorBuilder,
) -> Result<(RequestDescriptorBuilder, OperationKind)> {
    let described = match command {
        Command::Read {
            path,
            filters,
            sorters,
            select,
            expand,
            top,
            skip,
        } => {
            let mut builder = builder
                .entity_set(path)
                .filters(filters.iter().map(|f| parse_filter(f)).collect::<Result<Vec<_>>>()?)
                .sorters(sorters.iter().map(|s| parse_sorter(s)).collect::<Result<Vec<_>>>()?);
            if let Some(select) = select {
                builder = builder.select(select);
            }
            if let Some(expand) = expand {
                builder = builder.expand(expand);
            }
            if let Some(top) = top {
                builder = builder.top(top);
            }
            if let Some(skip) = skip {
                builder = builder.skip(skip);
            }
            (builder, OperationKind::Read)
        }
        Command::Create { path, payload } => (
            builder.entity_set(path).payload(parse_payload(&payload)?),
            OperationKind::Create,
        ),
        Command::Update { path, payload } => (
            builder.entity_set(path).payload(parse_payload(&payload)?),
            OperationKind::Update,
        ),
        Command::Delete { path } => (builder.entity_set(path), OperationKind::Delete),
        Command::Search {
            entity_set,
            query,
            fields,
        } => (
            builder
                .entity_set(entity_set)
                .filter(search_filter(&query, &fields)?),
            OperationKind::Read,
        ),
    };
    Ok(described)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let settings = load_settings();
    let service = Arc::new(load_fixture(&cli.fixture).await?);
    let notifier = Arc::new(TracingNotificationSink::new(settings.notification_titles()));
    let busy: Arc<dyn BusyIndicator> = Arc::new(settings.busy_dialog());
    let mut orchestrator = RequestOrchestrator::with_settings(notifier, busy, &settings);

    let client: Arc<dyn DataServiceClient> = service.clone();
    let builder = RequestDescriptor::builder()
        .service(client)
        .view(Arc::new(CliView))
        .on_success(|_, record| print_record(&record));
    let (builder, kind) = describe(cli.command, builder)?;
    orchestrator.configure(builder.build()?);

    match orchestrator.execute(kind).await {
        RequestOutcome::Completed(_) => {
            if cli.write_back && kind != OperationKind::Read {
                save_fixture(&service, &cli.fixture).await?;
                info!(fixture = %cli.fixture.display(), "changes written back");
            }
            Ok(())
        }
        RequestOutcome::Failed(err) => Err(anyhow!(err).context(format!("{kind} request failed"))),
        RequestOutcome::Rejected(err) => Err(anyhow!(err).context("request rejected")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_parse_typed_values() {
        assert_eq!(
            parse_filter("Status:eq:Active").expect("filter"),
            Filter::new("Status", FilterOperator::Eq, "Active")
        );
        assert_eq!(
            parse_filter("Amount:GE:100").expect("filter"),
            Filter::new("Amount", FilterOperator::Ge, 100)
        );
        assert_eq!(
            parse_filter("Amount:bt:10:20").expect("filter"),
            Filter::between("Amount", 10, 20)
        );
        assert_eq!(
            parse_filter("Note:contains:a:b").expect("filter"),
            Filter::new("Note", FilterOperator::Contains, "a:b")
        );
    }

    #[test]
    fn malformed_filters_are_rejected() {
        assert!(parse_filter("Status").is_err());
        assert!(parse_filter("Status:like:x").is_err());
        assert!(parse_filter("Amount:bt:10").is_err());
    }

    #[test]
    fn sorters_default_to_ascending() {
        assert_eq!(parse_sorter("Name").expect("sorter"), Sorter::ascending("Name"));
        assert_eq!(parse_sorter("Name:desc").expect("sorter"), Sorter::descending("Name"));
        assert!(parse_sorter("Name:sideways").is_err());
    }

    #[test]
    fn search_subcommand_reads_with_group_filter() {
        let cli = Cli::try_parse_from([
            "view-tools",
            "--fixture",
            "data.json",
            "search",
            "Customers",
            "acme",
            "--field",
            "Name",
            "--field",
            "City",
        ])
        .expect("cli");
        assert_eq!(cli.fixture, PathBuf::from("data.json"));
        assert!(matches!(cli.command, Command::Search { ref fields, .. } if fields.len() == 2));
    }

    #[test]
    fn invalid_payload_is_reported() {
        assert!(parse_payload("{not json").is_err());
        assert_eq!(
            parse_payload(r#"{"Amount": 1}"#).expect("payload"),
            serde_json::json!({"Amount": 1})
        );
    }
}
