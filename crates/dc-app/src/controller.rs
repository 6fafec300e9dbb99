//! Composition controller: the single owner of the chart list

use std::sync::Arc;

use dc_core::events::events::{
    ChartAdded, ChartCommitted, ChartRemoved, DashboardSaved, FilterChanged, Notification,
    NotificationLevel, SourceActivated, SourceLoadFailed, SourceLoaded,
};
use dc_core::{
    ChartConfig, ChartEditSession, ChartId, ChartType, ComposerSettings, DashboardBackend,
    DashboardId, DashboardStore, DashboardSummary, EditOutcome, EventBus, Point, Position, Record,
    Size,
};
use dc_data::{
    apply_filters, DataSource, DatasetOverview, FilterId, FilterKind, FilterSpec, FilterValue,
    InferenceConfig, SourceProvider, SourceRegistry, TypeInferencer,
};
use dc_views::{
    grid_cells, next_grid_position, render, DashboardExport, DragGesture, GridColumns, LayoutMode,
    ResizeGesture, ResizeHandle, Visual,
};
use serde_json::Value;

use crate::ComposeError;

/// Where a chart sits on the canvas under the current layout mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub chart_id: ChartId,
    pub position: Position,
    pub size: Size,
}

enum Gesture {
    Drag(ChartId, DragGesture),
    Resize(ChartId, ResizeGesture),
}

/// Orchestrates sources, filters, charts, layout and persistence.
///
/// Edit sessions hold drafts; only this controller writes the chart list.
pub struct CompositionController {
    settings: ComposerSettings,
    provider: Arc<dyn SourceProvider>,
    registry: SourceRegistry,
    store: DashboardStore,
    backend: Option<Arc<dyn DashboardBackend>>,
    events: Arc<EventBus>,

    charts: Vec<ChartConfig>,
    filters: Vec<FilterSpec>,
    filtered: Vec<Record>,
    selected: Option<ChartId>,
    layout: LayoutMode,
    gesture: Option<Gesture>,
}

impl CompositionController {
    pub fn new(provider: Arc<dyn SourceProvider>, settings: ComposerSettings) -> Result<Self, ComposeError> {
        let layout = LayoutMode::from_settings(&settings.layout)?;
        let inferencer = TypeInferencer::with_config(InferenceConfig::from(&settings.inference));

        Ok(Self {
            settings,
            provider,
            registry: SourceRegistry::new(inferencer),
            store: DashboardStore::new(),
            backend: None,
            events: Arc::new(EventBus::new()),
            charts: Vec::new(),
            filters: Vec::new(),
            filtered: Vec::new(),
            selected: None,
            layout,
            gesture: None,
        })
    }

    /// Mirror saves to a durable backend
    pub fn with_backend(mut self, backend: Arc<dyn DashboardBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Share a dashboard store with other controllers
    pub fn with_store(mut self, store: DashboardStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn settings(&self) -> &ComposerSettings {
        &self.settings
    }

    pub fn store(&self) -> &DashboardStore {
        &self.store
    }

    // ---- Sources ----

    /// Re-list sources from the provider
    pub async fn refresh_sources(&mut self) -> Result<usize, ComposeError> {
        let count = self.registry.refresh(self.provider.as_ref()).await?;

        // Refresh replaces every source wholesale, so the active one needs its rows again
        match self.registry.active_id().map(str::to_string) {
            Some(active) => self.load_source(&active).await?,
            None => self.reset_source_state(),
        }
        Ok(count)
    }

    pub fn sources(&self) -> impl Iterator<Item = &DataSource> {
        self.registry.sources()
    }

    pub fn active_source(&self) -> Option<&DataSource> {
        self.registry.active()
    }

    pub fn overview(&self) -> Option<DatasetOverview> {
        self.registry.active().map(DataSource::overview)
    }

    /// Make a source active.
    ///
    /// Filters, selection and in-flight gestures of the previous source are
    /// dropped before any row of the new one is requested; the chart list is
    /// whatever the store holds for the new source.
    pub fn select_source(&mut self, source_id: &str) -> Result<(), ComposeError> {
        self.registry.set_active(Some(source_id))?;
        self.reset_source_state();

        tracing::info!(
            "Activated source '{}' with {} saved charts",
            source_id,
            self.charts.len()
        );
        self.events.publish(SourceActivated {
            source_id: source_id.to_string(),
            restored_charts: self.charts.len(),
        });
        Ok(())
    }

    /// Fetch and enrich a source's preview rows
    pub async fn load_source(&mut self, source_id: &str) -> Result<(), ComposeError> {
        let limit = self.settings.preview_row_limit;
        let loaded = self
            .registry
            .load_source(self.provider.as_ref(), source_id, limit)
            .await
            .map(|source| SourceLoaded {
                source_id: source.id.clone(),
                row_count: source.rows.len(),
                column_count: source.columns.len(),
            });

        match loaded {
            Ok(event) => self.events.publish(event),
            Err(e) => {
                self.events.publish(SourceLoadFailed {
                    source_id: source_id.to_string(),
                    error: e.to_string(),
                });
                self.notify(NotificationLevel::Error, format!("Failed to load source: {}", e));
                return Err(e.into());
            }
        }

        // A load for a source that is no longer active only refreshes the registry
        if self.registry.active_id() == Some(source_id) {
            self.recompute();
        }
        Ok(())
    }

    /// Select a source and load its rows
    pub async fn activate(&mut self, source_id: &str) -> Result<(), ComposeError> {
        self.select_source(source_id)?;
        self.load_source(source_id).await
    }

    fn reset_source_state(&mut self) {
        self.charts = self
            .registry
            .active_id()
            .map(|id| self.store.load(id))
            .unwrap_or_default();
        self.filters.clear();
        self.selected = None;
        self.gesture = None;
        self.recompute();
    }

    fn active_id(&self) -> Result<String, ComposeError> {
        self.registry
            .active_id()
            .map(str::to_string)
            .ok_or(ComposeError::NoActiveSource)
    }

    // ---- Charts ----

    pub fn charts(&self) -> &[ChartConfig] {
        &self.charts
    }

    pub fn chart(&self, chart_id: ChartId) -> Option<&ChartConfig> {
        self.charts.iter().find(|c| c.id == chart_id)
    }

    pub fn selected(&self) -> Option<ChartId> {
        self.selected
    }

    /// Add an unbound chart after the existing ones and select it
    pub fn add_chart(&mut self, chart_type: ChartType) -> Result<ChartId, ComposeError> {
        let result = self.try_add_chart(chart_type);
        self.report(result)
    }

    fn try_add_chart(&mut self, chart_type: ChartType) -> Result<ChartId, ComposeError> {
        let source = self.registry.active().ok_or(ComposeError::NoActiveSource)?;
        if source.rows.is_empty() {
            return Err(ComposeError::NoRows(source.id.clone()));
        }

        let position = next_grid_position(self.charts.len(), self.grid_columns(), &self.settings.layout);
        let mut chart = ChartConfig::new(chart_type, position, self.settings.layout.default_size());
        chart.data = self.filtered.clone();
        chart.filters = self.filter_snapshot();

        let chart_id = chart.id;
        tracing::info!("Added {} chart {}", chart_type, chart_id);
        self.charts.push(chart);
        self.selected = Some(chart_id);
        self.persist_local();

        self.events.publish(ChartAdded { chart_id, chart_type });
        Ok(chart_id)
    }

    pub fn delete_chart(&mut self, chart_id: ChartId) -> Result<ChartConfig, ComposeError> {
        let index = self.index_of(chart_id)?;
        let removed = self.charts.remove(index);
        if self.selected == Some(chart_id) {
            self.selected = None;
        }
        if matches!(self.gesture, Some(Gesture::Drag(id, _) | Gesture::Resize(id, _)) if id == chart_id) {
            self.gesture = None;
        }
        self.persist_local();

        tracing::info!("Removed chart {}", chart_id);
        self.events.publish(ChartRemoved { chart_id });
        Ok(removed)
    }

    pub fn select_chart(&mut self, chart_id: Option<ChartId>) -> Result<(), ComposeError> {
        if let Some(id) = chart_id {
            self.index_of(id)?;
        }
        self.selected = chart_id;
        Ok(())
    }

    fn index_of(&self, chart_id: ChartId) -> Result<usize, ComposeError> {
        self.charts
            .iter()
            .position(|c| c.id == chart_id)
            .ok_or(ComposeError::UnknownChart(chart_id))
    }

    // ---- Edit sessions ----

    /// Start an edit session over a chart's committed configuration
    pub fn open_editor(&self, chart_id: ChartId) -> Result<ChartEditSession, ComposeError> {
        let index = self.index_of(chart_id)?;
        Ok(ChartEditSession::new(self.charts[index].clone()))
    }

    /// Render a session's draft against the live filtered rows
    pub fn preview_visual(&self, session: &ChartEditSession) -> Visual {
        render(&session.current(), &self.filtered)
    }

    /// Commit a session's draft onto the chart list and persist it.
    ///
    /// Only the fields the draft touched are written, so geometry changed by
    /// gestures while the panel was open is kept.
    pub fn apply_session(&mut self, session: &mut ChartEditSession) -> Result<EditOutcome, ComposeError> {
        let index = self.index_of(session.chart_id())?;
        let outcome = session.apply();

        if let EditOutcome::Applied(update) = &outcome {
            let chart = &mut self.charts[index];
            chart.apply_update(update);
            if update.touches_bindings() {
                chart.data = self.filtered.clone();
            }
            session.rebase(chart.clone())?;
            self.persist_local();

            tracing::info!("Committed edits to chart {}", session.chart_id());
            self.events.publish(ChartCommitted {
                chart_id: session.chart_id(),
            });
        }
        Ok(outcome)
    }

    /// Discard a session's draft and pick up the chart's latest committed state
    pub fn cancel_session(&self, session: &mut ChartEditSession) -> Result<EditOutcome, ComposeError> {
        let outcome = session.cancel();
        if let Some(chart) = self.chart(session.chart_id()) {
            session.rebase(chart.clone())?;
        }
        Ok(outcome)
    }

    /// Drop whatever the session holds when its panel closes. A chart deleted
    /// in the meantime leaves the session on its old baseline.
    pub fn reset_session(&self, session: &mut ChartEditSession) -> Result<(), ComposeError> {
        session.reset();
        if let Some(chart) = self.chart(session.chart_id()) {
            session.rebase(chart.clone())?;
        }
        Ok(())
    }

    // ---- Layout ----

    pub fn layout_mode(&self) -> LayoutMode {
        self.layout
    }

    pub fn set_layout_mode(&mut self, mode: LayoutMode) {
        tracing::debug!("Layout mode set to {:?}", mode);
        self.layout = mode;
        self.gesture = None;
    }

    pub fn set_grid_columns(&mut self, columns: u8) -> Result<(), ComposeError> {
        let columns = GridColumns::new(columns).map_err(ComposeError::from);
        let columns = self.report(columns)?;
        self.set_layout_mode(LayoutMode::Grid { columns });
        Ok(())
    }

    fn grid_columns(&self) -> GridColumns {
        match self.layout {
            LayoutMode::Grid { columns } => columns,
            LayoutMode::FreeForm => {
                GridColumns::new(self.settings.layout.grid_columns).unwrap_or_default()
            }
        }
    }

    /// Canvas placement of every chart, in document order
    pub fn placements(&self) -> Vec<Placement> {
        match self.layout {
            LayoutMode::Grid { columns } => {
                let sizes: Vec<Size> = self.charts.iter().map(|c| c.size).collect();
                grid_cells(&sizes, columns, &self.settings.layout)
                    .into_iter()
                    .zip(&self.charts)
                    .map(|(cell, chart)| Placement {
                        chart_id: chart.id,
                        position: cell.position,
                        size: cell.size,
                    })
                    .collect()
            }
            LayoutMode::FreeForm => self
                .charts
                .iter()
                .map(|c| Placement {
                    chart_id: c.id,
                    position: c.position,
                    size: c.size,
                })
                .collect(),
        }
    }

    fn free_form_chart(&self, chart_id: ChartId) -> Result<&ChartConfig, ComposeError> {
        if !self.layout.is_free_form() {
            return Err(ComposeError::NotFreeForm);
        }
        let index = self.index_of(chart_id)?;
        Ok(&self.charts[index])
    }

    pub fn begin_drag(&mut self, chart_id: ChartId, pointer: Point, canvas_origin: Point) -> Result<(), ComposeError> {
        let chart = self.free_form_chart(chart_id)?;
        self.gesture = Some(Gesture::Drag(
            chart_id,
            DragGesture::begin(pointer, canvas_origin, chart.position),
        ));
        Ok(())
    }

    pub fn begin_resize(&mut self, chart_id: ChartId, handle: ResizeHandle, pointer: Point) -> Result<(), ComposeError> {
        let chart = self.free_form_chart(chart_id)?;
        self.gesture = Some(Gesture::Resize(
            chart_id,
            ResizeGesture::begin(handle, pointer, chart.position, chart.size, &self.settings.layout),
        ));
        Ok(())
    }

    /// Apply one pointer move of the current gesture directly to the chart.
    ///
    /// Frames are not persisted; the store is written when the gesture ends.
    pub fn pointer_moved(&mut self, pointer: Point, canvas_origin: Point) -> Option<(Position, Size)> {
        let (chart_id, position, size) = match self.gesture.as_ref()? {
            Gesture::Drag(id, drag) => {
                let size = self.chart(*id)?.size;
                (*id, drag.update(pointer, canvas_origin), size)
            }
            Gesture::Resize(id, resize) => {
                let (position, size) = resize.update(pointer);
                (*id, position, size)
            }
        };

        let chart = self.charts.iter_mut().find(|c| c.id == chart_id)?;
        chart.position = position;
        chart.size = size;
        tracing::debug!("Chart {} at {:?} size {:?}", chart_id, position, size);
        Some((position, size))
    }

    /// Release the pointer and persist the resulting geometry
    pub fn end_gesture(&mut self) {
        if self.gesture.take().is_some() {
            self.persist_local();
        }
    }

    // ---- Filters ----

    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    /// Rows of the active source that pass every filter
    pub fn filtered_rows(&self) -> &[Record] {
        &self.filtered
    }

    /// Add a filter seeded from a column's enrichment
    pub fn add_filter(&mut self, kind: FilterKind, column: &str, label: Option<String>) -> Result<FilterId, ComposeError> {
        let result = self.try_add_filter(kind, column, label);
        self.report(result)
    }

    fn try_add_filter(&mut self, kind: FilterKind, column: &str, label: Option<String>) -> Result<FilterId, ComposeError> {
        let source = self.registry.active().ok_or(ComposeError::NoActiveSource)?;
        let column = source
            .column(column)
            .ok_or_else(|| ComposeError::UnknownColumn(column.to_string()))?;

        let filter = FilterSpec::new(kind, column, label);
        let id = filter.id;
        let (column, value) = (filter.column.clone(), filter.value.to_json());
        self.filters.push(filter);
        self.filter_changed(column, value);
        Ok(id)
    }

    /// Change a filter's value and re-evaluate every chart's rows
    pub fn set_filter_value(&mut self, filter_id: FilterId, value: FilterValue) -> Result<(), ComposeError> {
        let result = self.try_set_filter_value(filter_id, value);
        self.report(result)
    }

    fn try_set_filter_value(&mut self, filter_id: FilterId, value: FilterValue) -> Result<(), ComposeError> {
        let filter = self
            .filters
            .iter_mut()
            .find(|f| f.id == filter_id)
            .ok_or(ComposeError::UnknownFilter(filter_id))?;
        filter.set_value(value)?;

        let (column, value) = (filter.column.clone(), filter.value.to_json());
        self.filter_changed(column, value);
        Ok(())
    }

    pub fn remove_filter(&mut self, filter_id: FilterId) -> Result<FilterSpec, ComposeError> {
        let result = self.try_remove_filter(filter_id);
        self.report(result)
    }

    fn try_remove_filter(&mut self, filter_id: FilterId) -> Result<FilterSpec, ComposeError> {
        let index = self
            .filters
            .iter()
            .position(|f| f.id == filter_id)
            .ok_or(ComposeError::UnknownFilter(filter_id))?;
        let removed = self.filters.remove(index);

        // Another filter on the same column takes over its snapshot entry
        let remaining = self.filter_snapshot().shift_remove(&removed.column);
        let column = removed.column.clone();
        match remaining {
            Some(value) => self.filter_changed(column, value),
            None => {
                for chart in &mut self.charts {
                    chart.filters.shift_remove(&column);
                }
                self.publish_filter_change(column, Value::Null);
            }
        }
        Ok(removed)
    }

    /// Project the column's value into every chart, then refresh rows
    fn filter_changed(&mut self, column: String, value: Value) {
        for chart in &mut self.charts {
            chart.filters.insert(column.clone(), value.clone());
        }
        self.publish_filter_change(column, value);
    }

    /// Re-derive rows and announce the change
    fn publish_filter_change(&mut self, column: String, value: Value) {
        self.recompute();
        self.refresh_chart_data();

        self.events.publish(FilterChanged {
            column,
            value,
            visible_rows: self.filtered.len(),
        });
    }

    fn filter_snapshot(&self) -> indexmap::IndexMap<String, Value> {
        self.filters
            .iter()
            .map(|f| (f.column.clone(), f.value.to_json()))
            .collect()
    }

    /// Re-derive the filtered rows from the full row set of the active source
    fn recompute(&mut self) {
        self.filtered = match self.registry.active() {
            Some(source) => apply_filters(&source.rows, &self.filters),
            None => Vec::new(),
        };
        tracing::debug!(
            "{} rows visible after {} filters",
            self.filtered.len(),
            self.filters.len()
        );
    }

    fn refresh_chart_data(&mut self) {
        for chart in &mut self.charts {
            chart.data = self.filtered.clone();
        }
    }

    // ---- Output ----

    /// Visual for every chart, drawn from the live filtered rows
    pub fn render_charts(&self) -> Vec<(ChartId, Visual)> {
        self.charts
            .iter()
            .map(|chart| (chart.id, render(chart, &self.filtered)))
            .collect()
    }

    pub fn export(&self) -> Result<DashboardExport<'_>, ComposeError> {
        let source_id = self.registry.active_id().ok_or(ComposeError::NoActiveSource)?;
        Ok(DashboardExport::new(source_id, &self.charts, &self.filters))
    }

    // ---- Persistence ----

    fn persist_local(&self) {
        if let Some(source_id) = self.registry.active_id() {
            self.store.save(source_id, &self.charts);
        }
    }

    /// Save the current charts under `name`.
    ///
    /// With a backend the remote copy is written first; if that fails the
    /// local store is left untouched.
    pub async fn save_dashboard(&mut self, name: &str) -> Result<Option<DashboardSummary>, ComposeError> {
        let result = self.try_save_dashboard(name).await;
        self.report(result)
    }

    async fn try_save_dashboard(&mut self, name: &str) -> Result<Option<DashboardSummary>, ComposeError> {
        let source_id = self.active_id()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ComposeError::MissingName);
        }
        if self.charts.is_empty() {
            return Err(ComposeError::NoCharts);
        }

        let summary = match &self.backend {
            Some(backend) => Some(
                backend
                    .create(&source_id, name, &self.charts)
                    .await
                    .map_err(ComposeError::persistence)?,
            ),
            None => None,
        };
        self.store.save(&source_id, &self.charts);

        tracing::info!(
            "Saved dashboard '{}' with {} charts for '{}'",
            name,
            self.charts.len(),
            source_id
        );
        self.events.publish(DashboardSaved {
            source_id,
            name: Some(name.to_string()),
            chart_count: self.charts.len(),
        });
        self.notify(NotificationLevel::Info, format!("Dashboard '{}' saved", name));
        Ok(summary)
    }

    /// Dashboards saved remotely for the active source
    pub async fn list_saved(&self) -> Result<Vec<DashboardSummary>, ComposeError> {
        let source_id = self.active_id()?;
        let Some(backend) = &self.backend else {
            return Ok(Vec::new());
        };

        let listed = backend
            .list(&source_id)
            .await
            .map_err(ComposeError::persistence);
        self.report(listed)
    }

    /// Replace the chart list with a remotely saved dashboard
    pub async fn load_saved(&mut self, dashboard_id: DashboardId) -> Result<(), ComposeError> {
        let result = self.try_load_saved(dashboard_id).await;
        self.report(result)
    }

    async fn try_load_saved(&mut self, dashboard_id: DashboardId) -> Result<(), ComposeError> {
        let source_id = self.active_id()?;
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| ComposeError::Persistence("No dashboard backend configured".to_string()))?;

        let dashboard = backend
            .get(dashboard_id)
            .await
            .map_err(ComposeError::persistence)?;
        if dashboard.source_id != source_id {
            return Err(ComposeError::SourceMismatch {
                active: source_id,
                found: dashboard.source_id,
            });
        }

        tracing::info!(
            "Loaded dashboard '{}' ({} charts)",
            dashboard.name,
            dashboard.charts.len()
        );
        self.charts = dashboard.charts;
        self.selected = None;
        self.gesture = None;
        self.persist_local();
        Ok(())
    }

    // ---- Notifications ----

    fn notify(&self, level: NotificationLevel, message: String) {
        self.events.publish(Notification { level, message });
    }

    /// Publish validation and persistence failures as transient notices
    fn report<T>(&self, result: Result<T, ComposeError>) -> Result<T, ComposeError> {
        if let Err(e) = &result {
            let level = if e.is_validation() {
                NotificationLevel::Warning
            } else {
                NotificationLevel::Error
            };
            tracing::warn!("{}", e);
            self.notify(level, e.to_string());
        }
        result
    }
}
