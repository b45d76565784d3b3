//! Routing problem definition
//!
//! A `RoutingProblem` is built fresh for each optimization attempt and is
//! immutable once constructed, so concurrent batch jobs never share
//! solver state.

use anyhow::{ensure, Result};

use crate::services::matrix::DistanceMatrix;

/// Time window in minutes-of-day during which a stop may be serviced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub earliest: u32,
    pub latest: u32,
}

/// A location in the problem. Index 0 is the depot.
#[derive(Debug, Clone)]
pub struct Location {
    /// Demand weight in kg (0 for the depot)
    pub demand: f64,
    /// Optional service window
    pub window: Option<TimeWindow>,
    /// On-site service time in minutes
    pub service_minutes: u32,
}

impl Location {
    pub fn depot() -> Self {
        Self {
            demand: 0.0,
            window: None,
            service_minutes: 0,
        }
    }

    pub fn stop(demand: f64, window: Option<TimeWindow>) -> Self {
        Self {
            demand,
            window,
            service_minutes: 0,
        }
    }
}

/// Capacity limits of one vehicle, as seen by the solver
#[derive(Debug, Clone)]
pub struct VehicleSpec {
    /// Capacity weight in kg
    pub capacity: f64,
    /// Maximum number of non-depot stops
    pub max_stops: usize,
}

/// Immutable input to one solve attempt
#[derive(Debug, Clone)]
pub struct RoutingProblem {
    /// Depot location index (always 0)
    pub depot: usize,
    pub matrix: DistanceMatrix,
    /// Index-aligned with the matrix; `locations[0]` is the depot
    pub locations: Vec<Location>,
    pub vehicles: Vec<VehicleSpec>,
    /// Minutes-of-day at which every route leaves the depot
    pub start_minutes: u32,
}

impl RoutingProblem {
    pub fn new(
        matrix: DistanceMatrix,
        locations: Vec<Location>,
        vehicles: Vec<VehicleSpec>,
        start_minutes: u32,
    ) -> Result<Self> {
        ensure!(!locations.is_empty(), "problem needs at least the depot");
        ensure!(
            matrix.is_complete_for(locations.len()),
            "matrix dimension {} does not match {} locations",
            matrix.size,
            locations.len()
        );

        let depot = &locations[0];
        ensure!(depot.demand == 0.0, "depot must have zero demand");
        ensure!(depot.window.is_none(), "depot must have no time window");

        for (i, location) in locations.iter().enumerate() {
            ensure!(
                location.demand >= 0.0 && location.demand.is_finite(),
                "location {} has invalid demand {}",
                i,
                location.demand
            );
            if let Some(w) = &location.window {
                ensure!(
                    w.earliest <= w.latest,
                    "location {} has an inverted time window [{}, {}]",
                    i,
                    w.earliest,
                    w.latest
                );
            }
        }

        Ok(Self {
            depot: 0,
            matrix,
            locations,
            vehicles,
            start_minutes,
        })
    }

    /// Number of non-depot locations to route
    pub fn stop_count(&self) -> usize {
        self.locations.len() - 1
    }

    /// Walk a depot-relative stop sequence and compute arrival minutes at
    /// each stop. Arrival is `max(earliest, previous departure + travel)`;
    /// a vehicle may wait but never arrives before `earliest`. Returns
    /// `None` when any arrival misses its window or an edge is unreachable.
    pub fn schedule(&self, stops: &[usize]) -> Option<Vec<f64>> {
        let mut arrivals = Vec::with_capacity(stops.len());
        let mut time = self.start_minutes as f64;
        let mut prev = self.depot;

        for &stop in stops {
            if !self.matrix.is_reachable(prev, stop) {
                return None;
            }
            time += self.matrix.duration(prev, stop) as f64 / 60.0;

            if let Some(w) = &self.locations[stop].window {
                if time < w.earliest as f64 {
                    time = w.earliest as f64;
                }
                if time > w.latest as f64 {
                    return None;
                }
            }

            arrivals.push(time);
            time += self.locations[stop].service_minutes as f64;
            prev = stop;
        }

        // The route must be able to return to the depot
        if !stops.is_empty() && !self.matrix.is_reachable(prev, self.depot) {
            return None;
        }

        Some(arrivals)
    }

    /// Total distance in meters of a depot-to-depot tour over `stops`
    pub fn route_distance(&self, stops: &[usize]) -> u64 {
        self.tour_sum(stops, |from, to| self.matrix.distance(from, to))
    }

    /// Total travel duration in seconds of a depot-to-depot tour
    pub fn route_duration(&self, stops: &[usize]) -> u64 {
        self.tour_sum(stops, |from, to| self.matrix.duration(from, to))
    }

    fn tour_sum(&self, stops: &[usize], cell: impl Fn(usize, usize) -> u64) -> u64 {
        if stops.is_empty() {
            return 0;
        }
        let mut total = 0u64;
        let mut prev = self.depot;
        for &stop in stops {
            total = total.saturating_add(cell(prev, stop));
            prev = stop;
        }
        total.saturating_add(cell(prev, self.depot))
    }
}
