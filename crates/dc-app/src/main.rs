//! Headless driver for the dashboard composer

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dc_app::CompositionController;
use dc_core::events::events::Notification;
use dc_core::events::{downcast, handler_from_fn};
use dc_core::{ChartType, ChartUpdate, ComposerSettings};
use dc_data::{
    CsvSourceProvider, DataSource, SemanticType, SourceProvider, SqliteDashboardBackend,
    SqliteSourceProvider,
};

fn usage() -> ! {
    eprintln!("Usage: dashboard-composer <SQLITE_DB | CSV_DIR> [--source <ID>] [--settings <JSON>]");
    eprintln!("  ID: source id such as dataset:sales or snapshot:top_regions");
    std::process::exit(2);
}

struct Args {
    input: PathBuf,
    source: Option<String>,
    settings: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = std::env::args().skip(1);
    let input = args.next().map(PathBuf::from).unwrap_or_else(|| usage());
    let mut parsed = Args {
        input,
        source: None,
        settings: None,
    };

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--source" => parsed.source = Some(args.next().unwrap_or_else(|| usage())),
            "--settings" => parsed.settings = Some(args.next().map(PathBuf::from).unwrap_or_else(|| usage())),
            _ => usage(),
        }
    }
    parsed
}

/// Columns a chart type should bind to, if the source has them
fn bindings(chart_type: ChartType, source: &DataSource) -> Option<(String, String)> {
    let of_type = |ty: SemanticType| -> Vec<&str> {
        source
            .columns
            .iter()
            .filter(|c| c.semantic_type == ty)
            .map(|c| c.name.as_str())
            .collect()
    };
    let numbers = of_type(SemanticType::Number);
    let labels: Vec<&str> = of_type(SemanticType::String)
        .into_iter()
        .chain(of_type(SemanticType::Date))
        .collect();

    let (x, y) = match chart_type {
        ChartType::Scatter => (*numbers.first()?, *numbers.get(1).or(numbers.first())?),
        ChartType::Heatmap => (*labels.first()?, *labels.get(1).or(labels.first())?),
        _ => (*labels.first()?, *numbers.first()?),
    };
    Some((x.to_string(), y.to_string()))
}

fn open_provider(input: &Path) -> Result<(Arc<dyn SourceProvider>, Option<SqliteDashboardBackend>)> {
    if input.is_dir() {
        info!("Serving CSV files from {}", input.display());
        return Ok((Arc::new(CsvSourceProvider::new(input)), None));
    }

    info!("Serving SQLite database {}", input.display());
    let backend = SqliteDashboardBackend::open(input)
        .with_context(|| format!("Failed to open dashboard table in {}", input.display()))?;
    Ok((Arc::new(SqliteSourceProvider::new(input)), Some(backend)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args();
    let settings = match &args.settings {
        Some(path) => ComposerSettings::from_json_file(path)?,
        None => ComposerSettings::default(),
    };

    let (provider, backend) = open_provider(&args.input)?;
    let mut controller = CompositionController::new(provider, settings)?;
    if let Some(backend) = backend {
        controller = controller.with_backend(Arc::new(backend));
    }
    controller.events().subscribe::<Notification>(handler_from_fn(|event| {
        if let Some(note) = downcast::<Notification>(event) {
            eprintln!("[{:?}] {}", note.level, note.message);
        }
    }));

    let count = controller.refresh_sources().await?;
    info!("Found {} sources", count);

    let source_id = match args.source {
        Some(id) => id,
        None => controller
            .sources()
            .next()
            .map(|s| s.id.clone())
            .context("No sources found")?,
    };
    controller.activate(&source_id).await?;

    let source = controller.active_source().context("Source did not activate")?.clone();
    println!("Source: {} ({})", source.display_name, source.id);
    for column in &source.columns {
        println!("  {}", serde_json::to_string(column)?);
    }
    if let Some(overview) = controller.overview() {
        println!("Overview: {}", serde_json::to_string(&overview)?);
    }

    for chart_type in ChartType::ALL {
        let Some((x, y)) = bindings(chart_type, &source) else {
            warn!("No columns to bind a {} chart to", chart_type);
            continue;
        };
        let chart_id = controller.add_chart(chart_type)?;
        let mut session = controller.open_editor(chart_id)?;
        session.preview(ChartUpdate::default().with_x(x).with_y(y));
        controller.apply_session(&mut session)?;
    }

    for (chart_id, visual) in controller.render_charts() {
        info!("Chart {}: {}", chart_id, serde_json::to_string(&visual)?);
    }

    let export = controller.export()?;
    println!("{}", export.to_json_pretty()?);
    Ok(())
}
