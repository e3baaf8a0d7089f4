//! Dashboard sessions: current selections plus the tables derived from them.
//!
//! There is no implicit dependency tracking. Each table is registered with
//! the inputs it reads, and [`Dashboard::on_input_change`] recomputes exactly
//! the tables that list the changed input.

use std::sync::Arc;
use tracing::debug;

use crate::config::DashboardConfig;
use crate::processor::{Dataset, EngineError, FilterSpec, SummaryTable};

pub mod metric;
pub mod overlay;
pub mod selections;
pub mod views;

pub use metric::{Metric, MetricSpec};
pub use overlay::{Overlay, OverlayBands};
pub use selections::{Selections, SortOrder};
pub use views::ViewKind;

/// A form control a table can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputId {
    YearRange,
    Categories,
    Metric,
    Overlay,
    Sort,
    TopN,
}

/// A user interaction
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    YearRange(Option<(i64, i64)>),
    /// `None` removes the filter on `field`
    Categories {
        field: String,
        values: Option<Vec<String>>,
    },
    Metric(Metric),
    Overlay(Overlay),
    Sort(SortOrder),
    TopN(Option<usize>),
}

impl InputEvent {
    pub fn input(&self) -> InputId {
        match self {
            InputEvent::YearRange(_) => InputId::YearRange,
            InputEvent::Categories { .. } => InputId::Categories,
            InputEvent::Metric(_) => InputId::Metric,
            InputEvent::Overlay(_) => InputId::Overlay,
            InputEvent::Sort(_) => InputId::Sort,
            InputEvent::TopN(_) => InputId::TopN,
        }
    }

    fn apply(self, selections: &mut Selections) {
        match self {
            InputEvent::YearRange(range) => selections.year_range = range,
            InputEvent::Categories { field, values } => match values {
                Some(values) => {
                    selections.categories.insert(field, values);
                }
                None => {
                    selections.categories.remove(&field);
                }
            },
            InputEvent::Metric(metric) => selections.metric = metric,
            InputEvent::Overlay(overlay) => selections.overlay = overlay,
            InputEvent::Sort(order) => selections.sort = order,
            InputEvent::TopN(n) => selections.top_n = n,
        }
    }
}

/// Everything a table computation may read
pub struct ViewContext<'a> {
    pub dataset: &'a Dataset,
    pub selections: &'a Selections,
    /// Filter built from `selections`
    pub filter: &'a FilterSpec,
}

type ComputeFn = Box<dyn Fn(&ViewContext<'_>) -> Result<SummaryTable, EngineError> + Send + Sync>;

struct TableView {
    name: String,
    depends_on: Vec<InputId>,
    compute: ComputeFn,
}

/// One user's dashboard over a shared read-only dataset
pub struct Dashboard {
    dataset: Arc<Dataset>,
    year_field: Option<String>,
    selections: Selections,
    views: Vec<TableView>,
}

impl Dashboard {
    pub fn new(dataset: Arc<Dataset>, year_field: Option<&str>, selections: Selections) -> Self {
        Dashboard {
            dataset,
            year_field: year_field.map(str::to_string),
            selections,
            views: Vec::new(),
        }
    }

    /// Session with the config's selections and tables
    pub fn from_config(dataset: Arc<Dataset>, config: &DashboardConfig) -> Self {
        let mut dashboard = Dashboard::new(
            dataset,
            config.dataset.year_field.as_deref(),
            config.selections.clone(),
        );
        for table in &config.tables {
            dashboard.add_view(&table.name, table.view.clone());
        }
        dashboard
    }

    /// Registers a custom table
    pub fn register<F>(&mut self, name: &str, depends_on: &[InputId], compute: F)
    where
        F: Fn(&ViewContext<'_>) -> Result<SummaryTable, EngineError> + Send + Sync + 'static,
    {
        self.views.push(TableView {
            name: name.to_string(),
            depends_on: depends_on.to_vec(),
            compute: Box::new(compute),
        });
    }

    /// Registers a built-in table
    pub fn add_view(&mut self, name: &str, kind: ViewKind) {
        let depends_on = kind.depends_on();
        self.register(name, &depends_on, move |ctx| kind.compute(ctx));
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn view_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.views.iter().map(|v| v.name.as_str())
    }

    pub fn filter_spec(&self) -> FilterSpec {
        self.selections.filter_spec(self.year_field.as_deref())
    }

    /// Applies `event` and returns the recomputed tables that depend on it,
    /// in registration order
    pub fn on_input_change(
        &mut self,
        event: InputEvent,
    ) -> Result<Vec<(String, SummaryTable)>, EngineError> {
        let input = event.input();
        event.apply(&mut self.selections);

        let affected: Vec<&TableView> = self
            .views
            .iter()
            .filter(|v| v.depends_on.contains(&input))
            .collect();
        debug!(?input, tables = affected.len(), "Input changed");

        self.compute_views(affected)
    }

    pub fn recompute_all(&self) -> Result<Vec<(String, SummaryTable)>, EngineError> {
        self.compute_views(self.views.iter().collect())
    }

    pub fn recompute(&self, name: &str) -> Result<SummaryTable, EngineError> {
        let view = self
            .views
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| EngineError::InvalidArgument(format!("unknown table: {name}")))?;
        let filter = self.filter_spec();
        (view.compute)(&self.context(&filter))
    }

    /// Reference lines for `field` over the filtered rows, per the overlay toggles
    pub fn overlay_bands(&self, field: &str) -> Result<OverlayBands, EngineError> {
        let col = self.dataset.get_col(field)?;
        if !col.column_type().is_numeric() {
            return Err(EngineError::Type(format!(
                "cannot draw overlays for non-numeric field {field}"
            )));
        }
        let rows = self.filter_spec().apply(&self.dataset)?;
        Ok(OverlayBands::compute(
            &col.gather_f64(&rows),
            self.selections.overlay,
        ))
    }

    fn context<'a>(&'a self, filter: &'a FilterSpec) -> ViewContext<'a> {
        ViewContext {
            dataset: &self.dataset,
            selections: &self.selections,
            filter,
        }
    }

    fn compute_views(
        &self,
        views: Vec<&TableView>,
    ) -> Result<Vec<(String, SummaryTable)>, EngineError> {
        let filter = self.filter_spec();
        let ctx = self.context(&filter);
        views
            .into_iter()
            .map(|v| Ok((v.name.clone(), (v.compute)(&ctx)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{Column, GroupKey, Value};
    use chrono::NaiveDate;

    fn collisions() -> Arc<Dataset> {
        let dates = [(2014, 1, 1), (2014, 6, 1), (2015, 3, 1), (2016, 7, 4)]
            .iter()
            .map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
            .collect();
        Arc::new(
            Dataset::from_columns(vec![
                ("CRASH DATE", Column::from_dates(dates)),
                (
                    "BOROUGH",
                    Column::from_strs(&["QUEENS", "BRONX", "QUEENS", "BROOKLYN"]),
                ),
                ("NUMBER OF PERSONS INJURED", Column::from_i64(vec![2, 1, 0, 3])),
            ])
            .unwrap(),
        )
    }

    fn dashboard() -> Dashboard {
        let mut dashboard = Dashboard::new(collisions(), Some("CRASH DATE"), Selections::default());
        dashboard.add_view(
            "by_year",
            ViewKind::Timeline {
                date_field: "CRASH DATE".into(),
            },
        );
        dashboard.add_view(
            "by_borough",
            ViewKind::Ranked {
                field: "BOROUGH".into(),
            },
        );
        dashboard
    }

    fn names(tables: &[(String, SummaryTable)]) -> Vec<&str> {
        tables.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[test]
    fn test_only_dependent_tables_recompute() {
        let mut dashboard = dashboard();

        let sorted = dashboard
            .on_input_change(InputEvent::Sort(SortOrder::Ascending))
            .unwrap();
        assert_eq!(names(&sorted), ["by_borough"]);

        let ranged = dashboard
            .on_input_change(InputEvent::YearRange(Some((2014, 2015))))
            .unwrap();
        assert_eq!(names(&ranged), ["by_year", "by_borough"]);

        let overlay = dashboard
            .on_input_change(InputEvent::Overlay(Overlay::default()))
            .unwrap();
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_metric_switch_changes_measure() {
        let mut dashboard = dashboard();
        let tables = dashboard
            .on_input_change(InputEvent::Metric(Metric::PersonsInjured))
            .unwrap();
        let (_, by_year) = &tables[0];
        assert_eq!(by_year.measures, vec!["Persons injured"]);
        assert_eq!(by_year.column(0), vec![Some(3.0), Some(0.0), Some(3.0)]);
    }

    #[test]
    fn test_category_filter_and_clear() {
        let mut dashboard = dashboard();
        let tables = dashboard
            .on_input_change(InputEvent::Categories {
                field: "BOROUGH".into(),
                values: Some(vec!["QUEENS".into()]),
            })
            .unwrap();
        let by_borough = &tables[1].1;
        assert_eq!(by_borough.len(), 1);
        assert_eq!(
            by_borough.rows[0].key,
            GroupKey::Value(Value::from("QUEENS"))
        );

        dashboard
            .on_input_change(InputEvent::Categories {
                field: "BOROUGH".into(),
                values: None,
            })
            .unwrap();
        assert_eq!(dashboard.recompute("by_borough").unwrap().len(), 3);
    }

    #[test]
    fn test_sessions_do_not_share_selections() {
        let mut first = dashboard();
        let second = dashboard();
        first
            .on_input_change(InputEvent::YearRange(Some((2016, 2016))))
            .unwrap();
        assert_eq!(first.recompute("by_year").unwrap().len(), 1);
        assert_eq!(second.recompute("by_year").unwrap().len(), 3);
        assert!(Arc::ptr_eq(first.dataset(), first.dataset()));
    }

    #[test]
    fn test_overlay_bands_respect_filter() {
        let mut dashboard = dashboard();
        dashboard
            .on_input_change(InputEvent::Overlay(Overlay {
                mean: true,
                ..Overlay::default()
            }))
            .unwrap();
        dashboard
            .on_input_change(InputEvent::YearRange(Some((2014, 2014))))
            .unwrap();
        let bands = dashboard
            .overlay_bands("NUMBER OF PERSONS INJURED")
            .unwrap();
        assert_eq!(bands.mean, Some(1.5));
        assert!(matches!(
            dashboard.overlay_bands("BOROUGH"),
            Err(EngineError::Type(_))
        ));
    }

    #[test]
    fn test_unknown_table() {
        assert_eq!(
            dashboard().view_names().collect::<Vec<_>>(),
            ["by_year", "by_borough"]
        );
        assert!(matches!(
            dashboard().recompute("by_hour"),
            Err(EngineError::InvalidArgument(_))
        ));
    }
}
