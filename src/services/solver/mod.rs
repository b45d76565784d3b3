//! Multi-vehicle route solver
//!
//! Construction phase builds an initial feasible solution with greedy
//! nearest-feasible insertion; the improvement phase applies relocation
//! and pairwise exchange moves under a wall-clock budget. All scans use a
//! fixed order with strict improvement, so repeated solves of the same
//! problem produce the same objective value.

pub mod problem;
pub mod solution;

pub use problem::{Location, RoutingProblem, TimeWindow, VehicleSpec};
pub use solution::{extract, OptimizationResult, RouteAssignment, RouteSequence};

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::errors::OptimizeError;

/// One vehicle's working route during the solve, depot endpoints implicit
#[derive(Debug, Clone)]
struct Route {
    vehicle: usize,
    stops: Vec<usize>,
}

/// Stateless multi-vehicle solver
pub struct VehicleRoutingSolver {
    time_budget: Duration,
}

impl VehicleRoutingSolver {
    pub fn new(time_budget: Duration) -> Self {
        Self { time_budget }
    }

    /// Solve the problem, opening at most `problem.vehicles.len()` routes.
    ///
    /// Locations that fit no route are reported as unassigned with
    /// `feasible = false`. A problem where nothing can be routed at all
    /// fails with `NoSolutionFound`.
    pub fn solve(&self, problem: &RoutingProblem) -> Result<OptimizationResult, OptimizeError> {
        if problem.vehicles.is_empty() {
            return Err(OptimizeError::NoSolutionFound);
        }

        let started = Instant::now();
        let (mut routes, unassigned) = construct(problem);

        if problem.stop_count() > 0 && routes.iter().all(|r| r.stops.is_empty()) {
            return Err(OptimizeError::NoSolutionFound);
        }

        let deadline = started + self.time_budget;
        improve(problem, &mut routes, deadline);

        let sequences: Vec<RouteSequence> = routes
            .iter()
            .map(|r| {
                let mut order = Vec::with_capacity(r.stops.len() + 2);
                order.push(problem.depot);
                order.extend(&r.stops);
                order.push(problem.depot);
                RouteSequence { vehicle: r.vehicle, order }
            })
            .collect();

        let result = extract(problem, &sequences, &unassigned);

        info!(
            "Solved {} stops across {} routes in {} ms: {:.1} km, {} unassigned",
            problem.stop_count(),
            result.assignments.len(),
            started.elapsed().as_millis(),
            result.total_distance_meters as f64 / 1000.0,
            result.unassigned.len()
        );

        Ok(result)
    }
}

/// Greedy nearest-feasible insertion.
///
/// Repeatedly inserts the (location, route, position) with the lowest
/// extra distance among all feasible candidates. A new route may open on
/// any vehicle not yet bound to one, so a stop that only fits a larger
/// vehicle is not blocked by smaller vehicles earlier in the fleet. Scan
/// order breaks cost ties toward the earliest open route, then the
/// earliest unbound vehicle, then the earliest position.
fn construct(problem: &RoutingProblem) -> (Vec<Route>, Vec<usize>) {
    let mut unassigned: Vec<usize> = (0..problem.locations.len())
        .filter(|&i| i != problem.depot)
        .collect();
    let mut routes: Vec<Route> = Vec::new();

    loop {
        if unassigned.is_empty() {
            break;
        }

        // Existing routes first, then a fresh route for every vehicle
        // without one
        let mut slots: Vec<(Option<usize>, usize)> = routes
            .iter()
            .enumerate()
            .map(|(r, route)| (Some(r), route.vehicle))
            .collect();
        for vehicle in 0..problem.vehicles.len() {
            if !routes.iter().any(|route| route.vehicle == vehicle) {
                slots.push((None, vehicle));
            }
        }

        // (delta, route index if open, vehicle, position, unassigned index)
        let mut best: Option<(i64, Option<usize>, usize, usize, usize)> = None;

        for (ui, &loc) in unassigned.iter().enumerate() {
            for &(route_idx, vehicle) in &slots {
                let stops: &[usize] = match route_idx {
                    Some(r) => &routes[r].stops,
                    None => &[],
                };

                for pos in 0..=stops.len() {
                    let delta = insertion_delta(problem, stops, pos, loc);
                    if best.is_some_and(|(b, ..)| delta >= b) {
                        continue;
                    }

                    let mut candidate = stops.to_vec();
                    candidate.insert(pos, loc);
                    if fits(problem, vehicle, &candidate) {
                        best = Some((delta, route_idx, vehicle, pos, ui));
                    }
                }
            }
        }

        match best {
            Some((_, route_idx, vehicle, pos, ui)) => {
                let r = match route_idx {
                    Some(r) => r,
                    None => {
                        routes.push(Route { vehicle, stops: Vec::new() });
                        routes.len() - 1
                    }
                };
                let loc = unassigned.remove(ui);
                routes[r].stops.insert(pos, loc);
            }
            // No feasible slot anywhere; the rest stay unassigned
            None => break,
        }
    }

    if !unassigned.is_empty() {
        debug!("Construction left {} locations unassigned", unassigned.len());
    }

    (routes, unassigned)
}

/// Extra distance incurred by inserting `loc` at `pos`
fn insertion_delta(problem: &RoutingProblem, stops: &[usize], pos: usize, loc: usize) -> i64 {
    let prev = if pos == 0 { problem.depot } else { stops[pos - 1] };
    let next = if pos == stops.len() { problem.depot } else { stops[pos] };

    let added = problem.matrix.distance(prev, loc) as i64 + problem.matrix.distance(loc, next) as i64;
    added - problem.matrix.distance(prev, next) as i64
}

/// Check capacity, stop-count, and time-window feasibility of a full
/// stop sequence for the given vehicle.
fn fits(problem: &RoutingProblem, vehicle: usize, stops: &[usize]) -> bool {
    let spec = &problem.vehicles[vehicle];

    if stops.len() > spec.max_stops {
        return false;
    }

    let mut load = 0.0;
    for &stop in stops {
        load += problem.locations[stop].demand;
        if load > spec.capacity {
            return false;
        }
    }

    problem.schedule(stops).is_some()
}

/// Local search: alternate relocation and exchange passes until no move
/// improves total distance or the deadline passes.
fn improve(problem: &RoutingProblem, routes: &mut Vec<Route>, deadline: Instant) {
    let mut improved = true;
    while improved && Instant::now() < deadline {
        improved = false;
        if relocate_pass(problem, routes, deadline) {
            improved = true;
        }
        if exchange_pass(problem, routes, deadline) {
            improved = true;
        }
    }
}

/// Move one stop to any other position, in its own route or another.
/// Applies the first strictly improving feasible move found.
fn relocate_pass(problem: &RoutingProblem, routes: &mut Vec<Route>, deadline: Instant) -> bool {
    for a in 0..routes.len() {
        for i in 0..routes[a].stops.len() {
            if Instant::now() >= deadline {
                return false;
            }

            let loc = routes[a].stops[i];
            let mut donor = routes[a].stops.clone();
            donor.remove(i);
            let old_a = problem.route_distance(&routes[a].stops);

            for b in 0..routes.len() {
                let target = if b == a { donor.clone() } else { routes[b].stops.clone() };
                let old_b = if b == a { 0 } else { problem.route_distance(&routes[b].stops) };

                for pos in 0..=target.len() {
                    if b == a && pos == i {
                        continue;
                    }

                    let mut candidate = target.clone();
                    candidate.insert(pos, loc);

                    let (new_a, new_b) = if b == a {
                        (problem.route_distance(&candidate), 0)
                    } else {
                        (problem.route_distance(&donor), problem.route_distance(&candidate))
                    };

                    let delta = new_a as i64 + new_b as i64 - old_a as i64 - old_b as i64;
                    if delta >= 0 {
                        continue;
                    }

                    let feasible = if b == a {
                        fits(problem, routes[a].vehicle, &candidate)
                    } else {
                        fits(problem, routes[a].vehicle, &donor)
                            && fits(problem, routes[b].vehicle, &candidate)
                    };

                    if feasible {
                        if b == a {
                            routes[a].stops = candidate;
                        } else {
                            routes[a].stops = donor;
                            routes[b].stops = candidate;
                        }
                        return true;
                    }
                }
            }
        }
    }

    false
}

/// Swap a pair of stops between two different routes.
/// Applies the first strictly improving feasible swap found.
fn exchange_pass(problem: &RoutingProblem, routes: &mut Vec<Route>, deadline: Instant) -> bool {
    for a in 0..routes.len() {
        for b in (a + 1)..routes.len() {
            if Instant::now() >= deadline {
                return false;
            }

            let old = problem.route_distance(&routes[a].stops)
                + problem.route_distance(&routes[b].stops);

            for i in 0..routes[a].stops.len() {
                for j in 0..routes[b].stops.len() {
                    let mut sa = routes[a].stops.clone();
                    let mut sb = routes[b].stops.clone();
                    std::mem::swap(&mut sa[i], &mut sb[j]);

                    let new = problem.route_distance(&sa) + problem.route_distance(&sb);
                    if (new as i64) - (old as i64) >= 0 {
                        continue;
                    }

                    if fits(problem, routes[a].vehicle, &sa) && fits(problem, routes[b].vehicle, &sb)
                    {
                        routes[a].stops = sa;
                        routes[b].stops = sb;
                        return true;
                    }
                }
            }
        }
    }

    false
}
