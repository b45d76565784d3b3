//! Solution extraction
//!
//! Converts the solver's internal depot-to-depot sequences into
//! externally consumable route assignments. Pure transformation: depot
//! endpoints are stripped, aggregates are recomputed from the matrix for
//! auditability, and empty routes are discarded.

use super::problem::RoutingProblem;

/// Internal per-route sequence produced by the solver, depot at both ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSequence {
    /// Index into the problem's vehicle list
    pub vehicle: usize,
    /// Location indices, starting and ending at the depot
    pub order: Vec<usize>,
}

/// Externally visible route for one vehicle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAssignment {
    pub vehicle: usize,
    /// Non-depot location indices in visiting order
    pub stops: Vec<usize>,
    pub distance_meters: u64,
    pub duration_seconds: u64,
}

/// Result of one solve attempt
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub assignments: Vec<RouteAssignment>,
    pub total_distance_meters: u64,
    pub total_duration_seconds: u64,
    /// Objective value minimized by the solver (total distance)
    pub objective_meters: u64,
    /// False when any location could not be assigned
    pub feasible: bool,
    /// Location indices left out of every route
    pub unassigned: Vec<usize>,
}

/// Extract route assignments from solver sequences.
///
/// Guarantee: the union of stops across the returned assignments equals
/// the set of non-depot locations in `sequences`, exactly once each.
pub fn extract(
    problem: &RoutingProblem,
    sequences: &[RouteSequence],
    unassigned: &[usize],
) -> OptimizationResult {
    let mut assignments = Vec::new();
    let mut total_distance = 0u64;
    let mut total_duration = 0u64;

    for sequence in sequences {
        let stops: Vec<usize> = sequence
            .order
            .iter()
            .copied()
            .filter(|&i| i != problem.depot)
            .collect();

        if stops.is_empty() {
            continue;
        }

        let distance = problem.route_distance(&stops);
        let duration = problem.route_duration(&stops);
        total_distance = total_distance.saturating_add(distance);
        total_duration = total_duration.saturating_add(duration);

        assignments.push(RouteAssignment {
            vehicle: sequence.vehicle,
            stops,
            distance_meters: distance,
            duration_seconds: duration,
        });
    }

    let mut unassigned = unassigned.to_vec();
    unassigned.sort_unstable();

    OptimizationResult {
        assignments,
        total_distance_meters: total_distance,
        total_duration_seconds: total_duration,
        objective_meters: total_distance,
        feasible: unassigned.is_empty(),
        unassigned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::matrix::DistanceMatrix;
    use crate::services::solver::problem::{Location, VehicleSpec};

    fn problem(n: usize) -> RoutingProblem {
        let mut matrix = DistanceMatrix::zeroed(n);
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    matrix.distances[i][j] = 1_000 * (i + j) as u64;
                    matrix.durations[i][j] = 60 * (i + j) as u64;
                }
            }
        }
        let mut locations = vec![Location::depot()];
        for _ in 1..n {
            locations.push(Location::stop(1.0, None));
        }
        RoutingProblem::new(
            matrix,
            locations,
            vec![VehicleSpec { capacity: 100.0, max_stops: 10 }; 2],
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_extract_strips_depot_endpoints() {
        let problem = problem(4);
        let sequences = vec![RouteSequence { vehicle: 0, order: vec![0, 2, 1, 0] }];

        let result = extract(&problem, &sequences, &[]);
        assert_eq!(result.assignments.len(), 1);
        assert_eq!(result.assignments[0].stops, vec![2, 1]);
    }

    #[test]
    fn test_extract_drops_empty_routes() {
        let problem = problem(3);
        let sequences = vec![
            RouteSequence { vehicle: 0, order: vec![0, 1, 2, 0] },
            RouteSequence { vehicle: 1, order: vec![0, 0] },
        ];

        let result = extract(&problem, &sequences, &[]);
        assert_eq!(result.assignments.len(), 1);
    }

    #[test]
    fn test_extract_recomputes_aggregates_from_matrix() {
        let problem = problem(3);
        let sequences = vec![RouteSequence { vehicle: 0, order: vec![0, 1, 2, 0] }];

        let result = extract(&problem, &sequences, &[]);
        // 0->1 (1000) + 1->2 (3000) + 2->0 (2000)
        assert_eq!(result.assignments[0].distance_meters, 6_000);
        assert_eq!(result.assignments[0].duration_seconds, 360);
        assert_eq!(result.total_distance_meters, 6_000);
        assert_eq!(result.objective_meters, 6_000);
    }

    #[test]
    fn test_extract_union_of_stops_is_exact() {
        let problem = problem(5);
        let sequences = vec![
            RouteSequence { vehicle: 0, order: vec![0, 3, 1, 0] },
            RouteSequence { vehicle: 1, order: vec![0, 4, 0] },
        ];

        let result = extract(&problem, &sequences, &[2]);
        let mut seen: Vec<usize> = result
            .assignments
            .iter()
            .flat_map(|a| a.stops.iter().copied())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 3, 4]);
        assert!(!result.feasible);
        assert_eq!(result.unassigned, vec![2]);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let problem = problem(4);
        let sequences = vec![
            RouteSequence { vehicle: 0, order: vec![0, 1, 0] },
            RouteSequence { vehicle: 1, order: vec![0, 3, 2, 0] },
        ];

        let a = extract(&problem, &sequences, &[]);
        let b = extract(&problem, &sequences, &[]);
        assert_eq!(a.assignments, b.assignments);
        assert_eq!(a.total_distance_meters, b.total_distance_meters);
        assert_eq!(a.feasible, b.feasible);
    }
}
