use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use dc_app::{ComposeError, CompositionController};
use dc_core::events::events::{Notification, NotificationLevel};
use dc_core::events::{downcast, handler_from_fn};
use dc_core::{
    ChartConfig, ChartType, ChartUpdate, ComposerSettings, Dashboard, DashboardBackend,
    DashboardId, DashboardSummary, Record,
};
use dc_data::{FilterKind, FilterValue, MemorySourceProvider, NumericRange, SqliteDashboardBackend};
use dc_views::Visual;

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn sales_rows() -> Vec<Record> {
    vec![
        record(json!({ "region": "N", "sales": 10 })),
        record(json!({ "region": "S", "sales": 20 })),
    ]
}

fn provider() -> Arc<MemorySourceProvider> {
    Arc::new(
        MemorySourceProvider::new()
            .with_dataset("a", sales_rows())
            .with_dataset(
                "b",
                vec![
                    record(json!({ "city": "Oslo", "temp": 3.5 })),
                    record(json!({ "city": "Rome", "temp": 18.0 })),
                ],
            ),
    )
}

async fn controller() -> CompositionController {
    let mut controller = CompositionController::new(provider(), ComposerSettings::default()).unwrap();
    controller.refresh_sources().await.unwrap();
    controller
}

fn bound(controller: &mut CompositionController, chart_type: ChartType, x: &str, y: &str) -> ChartConfig {
    let id = controller.add_chart(chart_type).unwrap();
    let mut session = controller.open_editor(id).unwrap();
    session.preview(ChartUpdate::default().with_x(x));
    session.preview(ChartUpdate::default().with_y(y).with_title("Sales by region"));
    controller.apply_session(&mut session).unwrap();
    controller.chart(id).unwrap().clone()
}

fn notifications(controller: &CompositionController) -> Arc<Mutex<Vec<(NotificationLevel, String)>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    controller
        .events()
        .subscribe::<Notification>(handler_from_fn(move |event| {
            if let Some(note) = downcast::<Notification>(event) {
                sink.lock().push((note.level, note.message.clone()));
            }
        }));
    seen
}

#[tokio::test]
async fn select_filter_defaults_to_first_value() {
    let mut controller = controller().await;
    controller.activate("dataset:a").await.unwrap();

    controller.add_filter(FilterKind::Select, "region", None).unwrap();
    assert_eq!(controller.filters()[0].value, FilterValue::Single(json!("N")));
    assert_eq!(controller.filtered_rows(), &sales_rows()[..1]);
}

#[tokio::test]
async fn filter_column_name_ignores_case() {
    let mut controller = controller().await;
    controller.activate("dataset:a").await.unwrap();

    let filter = controller.add_filter(FilterKind::Checkbox, "Region", None).unwrap();
    controller
        .set_filter_value(filter, FilterValue::Many(vec![json!("N")]))
        .unwrap();
    assert_eq!(controller.filters()[0].column, "region");
    assert_eq!(controller.filtered_rows(), &sales_rows()[..1]);
}

#[tokio::test]
async fn export_carries_active_source_and_filters() {
    let mut controller = controller().await;
    assert!(matches!(controller.export(), Err(ComposeError::NoActiveSource)));

    controller.activate("dataset:a").await.unwrap();
    bound(&mut controller, ChartType::Bar, "region", "sales");
    controller.add_filter(FilterKind::Select, "region", None).unwrap();

    let exported: Value = serde_json::from_str(&controller.export().unwrap().to_json_pretty().unwrap()).unwrap();
    assert_eq!(exported["sourceId"], "dataset:a");
    assert_eq!(exported["charts"][0]["x"], "region");
    assert_eq!(exported["charts"][0]["filters"]["region"], "N");
    assert_eq!(exported["filters"][0]["column"], "region");
}

#[tokio::test]
async fn slider_filter_narrows_rows() {
    let mut controller = controller().await;
    controller.activate("dataset:a").await.unwrap();

    let slider = controller.add_filter(FilterKind::Slider, "sales", None).unwrap();
    assert_eq!(controller.filtered_rows().len(), 2);

    controller
        .set_filter_value(slider, FilterValue::Range(NumericRange::new(15.0, 25.0)))
        .unwrap();
    assert_eq!(controller.filtered_rows(), &sales_rows()[1..]);
}

#[tokio::test]
async fn unbound_chart_renders_placeholder() {
    let mut controller = controller().await;
    controller.activate("dataset:a").await.unwrap();
    controller.add_chart(ChartType::Bar).unwrap();

    let rendered = controller.render_charts();
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].1.is_placeholder());
}

#[tokio::test]
async fn filters_drive_rendered_series() {
    let mut controller = controller().await;
    controller.activate("dataset:a").await.unwrap();
    bound(&mut controller, ChartType::Bar, "region", "sales");

    let filter = controller.add_filter(FilterKind::Checkbox, "region", None).unwrap();
    controller
        .set_filter_value(filter, FilterValue::Many(vec![json!("S")]))
        .unwrap();

    let (_, visual) = &controller.render_charts()[0];
    assert_eq!(
        *visual,
        Visual::Series {
            chart_type: ChartType::Bar,
            labels: vec!["S".to_string()],
            values: vec![20.0],
        }
    );
}

#[tokio::test]
async fn switching_sources_restores_saved_charts() {
    let mut controller = controller().await;
    controller.activate("dataset:a").await.unwrap();
    let first = bound(&mut controller, ChartType::Bar, "region", "sales");
    let second = bound(&mut controller, ChartType::Pie, "region", "sales");
    controller.add_filter(FilterKind::Select, "region", None).unwrap();
    controller.save_dashboard("Regional").await.unwrap();
    let saved = controller.charts().to_vec();

    controller.activate("dataset:b").await.unwrap();
    assert!(controller.charts().is_empty());
    assert!(controller.filters().is_empty());
    assert_eq!(controller.selected(), None);

    controller.activate("dataset:a").await.unwrap();
    assert!(controller.filters().is_empty());
    assert_eq!(controller.charts(), saved.as_slice());
    assert_eq!(controller.charts()[0].id, first.id);
    assert_eq!(controller.charts()[1].id, second.id);
}

#[tokio::test]
async fn validation_errors_are_notified_and_leave_state() {
    let mut controller = controller().await;
    let seen = notifications(&controller);

    assert!(matches!(
        controller.add_chart(ChartType::Line),
        Err(ComposeError::NoActiveSource)
    ));
    controller.activate("dataset:a").await.unwrap();
    assert!(matches!(
        controller.save_dashboard("Empty").await,
        Err(ComposeError::NoCharts)
    ));

    assert!(controller.charts().is_empty());
    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|(level, _)| *level == NotificationLevel::Warning));
}

struct FailingBackend;

#[async_trait]
impl DashboardBackend for FailingBackend {
    async fn create(&self, _: &str, _: &str, _: &[ChartConfig]) -> anyhow::Result<DashboardSummary> {
        anyhow::bail!("backend offline")
    }

    async fn list(&self, _: &str) -> anyhow::Result<Vec<DashboardSummary>> {
        anyhow::bail!("backend offline")
    }

    async fn get(&self, _: DashboardId) -> anyhow::Result<Dashboard> {
        anyhow::bail!("backend offline")
    }
}

#[tokio::test]
async fn failed_remote_save_does_not_touch_local_store() {
    let mut controller = CompositionController::new(provider(), ComposerSettings::default())
        .unwrap()
        .with_backend(Arc::new(FailingBackend));
    controller.refresh_sources().await.unwrap();
    controller.activate("dataset:a").await.unwrap();
    let seen = notifications(&controller);

    bound(&mut controller, ChartType::Line, "region", "sales");
    let before = controller.store().load("dataset:a");

    // Filter changes reach the charts but are only stored on save
    controller.add_filter(FilterKind::Select, "region", None).unwrap();
    assert_ne!(controller.charts(), before.as_slice());

    let result = controller.save_dashboard("Offline").await;
    assert!(matches!(result, Err(ComposeError::Persistence(_))));
    assert_eq!(controller.store().load("dataset:a"), before);
    assert_eq!(seen.lock()[0].0, NotificationLevel::Error);
    assert!(controller.list_saved().await.is_err());
}

#[tokio::test]
async fn sqlite_backend_save_list_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(SqliteDashboardBackend::open(dir.path().join("dash.db")).unwrap());

    let mut controller = CompositionController::new(provider(), ComposerSettings::default())
        .unwrap()
        .with_backend(backend);
    controller.refresh_sources().await.unwrap();
    controller.activate("dataset:a").await.unwrap();

    bound(&mut controller, ChartType::Bar, "region", "sales");
    let summary = controller.save_dashboard("First").await.unwrap().unwrap();
    let first = controller.charts().to_vec();

    bound(&mut controller, ChartType::Scatter, "sales", "sales");
    controller.save_dashboard("Second").await.unwrap();
    assert_eq!(controller.charts().len(), 2);

    let listed = controller.list_saved().await.unwrap();
    assert_eq!(
        listed.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        vec!["First", "Second"]
    );

    controller.load_saved(summary.id).await.unwrap();
    assert_eq!(controller.charts(), first.as_slice());
    assert_eq!(controller.store().load("dataset:a"), first);

    controller.activate("dataset:b").await.unwrap();
    assert!(matches!(
        controller.load_saved(summary.id).await,
        Err(ComposeError::SourceMismatch { .. })
    ));
}
