use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::processor::{AggregateOp, Aggregation, EngineError};

/// A selectable statistic: which field, how it is labelled, how it aggregates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSpec {
    /// `None` counts records
    pub field: Option<&'static str>,
    pub label: &'static str,
    pub op: AggregateOp,
}

/// Statistic chosen in a dashboard's metric dropdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Collisions,
    PersonsInjured,
    PersonsKilled,
    PedestriansInjured,
    CyclistsInjured,
    MotoristsInjured,
    Close,
    Volume,
    TokenCount,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::Collisions,
        Metric::PersonsInjured,
        Metric::PersonsKilled,
        Metric::PedestriansInjured,
        Metric::CyclistsInjured,
        Metric::MotoristsInjured,
        Metric::Close,
        Metric::Volume,
        Metric::TokenCount,
    ];

    pub fn spec(self) -> MetricSpec {
        let (field, label, op) = match self {
            Metric::Collisions => (None, "Collisions", AggregateOp::Count),
            Metric::PersonsInjured => (
                Some("NUMBER OF PERSONS INJURED"),
                "Persons injured",
                AggregateOp::Sum,
            ),
            Metric::PersonsKilled => (
                Some("NUMBER OF PERSONS KILLED"),
                "Persons killed",
                AggregateOp::Sum,
            ),
            Metric::PedestriansInjured => (
                Some("NUMBER OF PEDESTRIANS INJURED"),
                "Pedestrians injured",
                AggregateOp::Sum,
            ),
            Metric::CyclistsInjured => (
                Some("NUMBER OF CYCLIST INJURED"),
                "Cyclists injured",
                AggregateOp::Sum,
            ),
            Metric::MotoristsInjured => (
                Some("NUMBER OF MOTORIST INJURED"),
                "Motorists injured",
                AggregateOp::Sum,
            ),
            // year-end close
            Metric::Close => (Some("Close"), "Close", AggregateOp::Last),
            Metric::Volume => (Some("Volume"), "Volume", AggregateOp::Sum),
            Metric::TokenCount => (None, "Tokens", AggregateOp::Count),
        };
        MetricSpec { field, label, op }
    }

    /// Aggregation named after the metric's label
    pub fn aggregation(self) -> Aggregation {
        let spec = self.spec();
        let agg = match spec.field {
            Some(field) => Aggregation::new(field, spec.op),
            None => Aggregation::count(),
        };
        agg.alias(spec.label)
    }

    fn name(self) -> &'static str {
        match self {
            Metric::Collisions => "collisions",
            Metric::PersonsInjured => "persons_injured",
            Metric::PersonsKilled => "persons_killed",
            Metric::PedestriansInjured => "pedestrians_injured",
            Metric::CyclistsInjured => "cyclists_injured",
            Metric::MotoristsInjured => "motorists_injured",
            Metric::Close => "close",
            Metric::Volume => "volume",
            Metric::TokenCount => "token_count",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| EngineError::InvalidArgument(format!("unknown metric: {s}")))
    }
}
