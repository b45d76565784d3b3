//! Batch optimization workflow
//!
//! Owns the full lifecycle of one optimization run: claim the batch,
//! assemble the routing problem, solve, persist routes, and always leave
//! the batch in a terminal state (`ready` or `failed`).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::queries::{batch, fleet, route};
use crate::errors::OptimizeError;
use crate::services::matrix::ProviderChain;
use crate::services::solver::{
    Location, RoutingProblem, TimeWindow, VehicleRoutingSolver, VehicleSpec,
};
use crate::types::delivery::Delivery;
use crate::types::route::{OptimizationSummary, RouteRecord, StopRecord};
use crate::types::Coordinates;

/// Default depot when the batch has no coordinates: Santo Domingo center
const DEFAULT_DEPOT: Coordinates = Coordinates { lat: 18.4861, lng: -69.9312 };

/// Minutes-of-day at which routes leave the depot (08:00)
const ROUTE_START_MINUTES: u32 = 480;

pub struct BatchOptimizer {
    pool: PgPool,
    providers: Arc<ProviderChain>,
    solver_budget: Duration,
}

impl BatchOptimizer {
    pub fn new(pool: PgPool, providers: Arc<ProviderChain>, solver_budget: Duration) -> Self {
        Self {
            pool,
            providers,
            solver_budget,
        }
    }

    /// Validate preconditions and claim the batch for optimization.
    ///
    /// Claiming is a guarded UPDATE, so under concurrent submissions
    /// exactly one caller proceeds and the rest get `AlreadyOptimizing`.
    /// Precondition failures happen before the claim and leave the batch
    /// status untouched.
    pub async fn submit(
        &self,
        batch_id: Uuid,
        user_id: Uuid,
        force: bool,
    ) -> Result<(), OptimizeError> {
        let batch = batch::get_batch(&self.pool, batch_id)
            .await?
            .ok_or(OptimizeError::BatchNotFound)?;

        if batch.user_id != user_id {
            return Err(OptimizeError::BatchNotFound);
        }

        let vehicles = fleet::get_active_vehicles(&self.pool, user_id).await?;
        if vehicles.is_empty() {
            return Err(OptimizeError::PreconditionNotMet(
                "no active vehicles available".to_string(),
            ));
        }

        let drivers = fleet::get_active_drivers(&self.pool, user_id).await?;
        if drivers.is_empty() {
            return Err(OptimizeError::PreconditionNotMet(
                "no active drivers available".to_string(),
            ));
        }

        let deliveries = batch::get_pending_deliveries(&self.pool, batch_id).await?;
        if !deliveries.iter().any(Delivery::has_coordinates) {
            return Err(OptimizeError::PreconditionNotMet(
                "batch has no pending deliveries with coordinates".to_string(),
            ));
        }

        batch::claim_for_optimization(&self.pool, batch_id, force).await
    }

    /// Mark a previously claimed batch `failed` without running a solve.
    ///
    /// Used when the job cannot be enqueued after the claim succeeded, so
    /// the batch does not sit in `optimizing` with no job behind it. A
    /// failed batch can be re-submitted.
    pub async fn abandon(&self, batch_id: Uuid) {
        batch::mark_failed(&self.pool, batch_id).await;
    }

    /// Run the optimization for a previously claimed batch.
    ///
    /// On any error the batch is marked `failed` before the error is
    /// returned, so a batch never gets stuck in `optimizing`.
    pub async fn run(
        &self,
        batch_id: Uuid,
        user_id: Uuid,
    ) -> Result<OptimizationSummary, OptimizeError> {
        match self.optimize(batch_id, user_id).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                warn!("Optimization of batch {} failed: {}", batch_id, e);
                batch::mark_failed(&self.pool, batch_id).await;
                Err(e)
            }
        }
    }

    async fn optimize(
        &self,
        batch_id: Uuid,
        user_id: Uuid,
    ) -> Result<OptimizationSummary, OptimizeError> {
        let batch = batch::get_batch(&self.pool, batch_id)
            .await?
            .ok_or(OptimizeError::BatchNotFound)?;

        let all_deliveries = batch::get_pending_deliveries(&self.pool, batch_id).await?;
        let vehicles = fleet::get_active_vehicles(&self.pool, user_id).await?;
        let drivers = fleet::get_active_drivers(&self.pool, user_id).await?;

        // Deliveries without coordinates cannot be routed; they are
        // reported as unassigned and stay pending
        let (routable, unroutable): (Vec<Delivery>, Vec<Delivery>) = all_deliveries
            .into_iter()
            .partition(Delivery::has_coordinates);

        if routable.is_empty() {
            return Err(OptimizeError::PreconditionNotMet(
                "batch has no pending deliveries with coordinates".to_string(),
            ));
        }

        let depot = match (batch.depot_lat, batch.depot_lng) {
            (Some(lat), Some(lng)) => Coordinates { lat, lng },
            _ => DEFAULT_DEPOT,
        };

        let mut points = Vec::with_capacity(routable.len() + 1);
        points.push(depot);
        for delivery in &routable {
            // has_coordinates held above
            points.push(Coordinates {
                lat: delivery.lat.unwrap_or(0.0),
                lng: delivery.lng.unwrap_or(0.0),
            });
        }

        let matrix = self.providers.get_matrix(&points).await?;

        let mut locations = Vec::with_capacity(points.len());
        locations.push(Location::depot());
        for delivery in &routable {
            let window = delivery
                .window_minutes()
                .map(|(earliest, latest)| TimeWindow { earliest, latest });
            locations.push(Location::stop(delivery.weight.unwrap_or(0.0), window));
        }

        let specs: Vec<VehicleSpec> = vehicles
            .iter()
            .map(|v| VehicleSpec {
                capacity: v.capacity_weight.unwrap_or(f64::INFINITY),
                max_stops: v.max_stops.max(0) as usize,
            })
            .collect();

        let problem = RoutingProblem::new(matrix, locations, specs, ROUTE_START_MINUTES)?;

        let solver = VehicleRoutingSolver::new(self.solver_budget);
        let result = solver.solve(&problem)?;

        let mut routes = Vec::with_capacity(result.assignments.len());
        for (i, assignment) in result.assignments.iter().enumerate() {
            let stops = assignment
                .stops
                .iter()
                .enumerate()
                .map(|(pos, &loc)| StopRecord {
                    // location index 0 is the depot, so stop i maps to
                    // routable[i - 1]
                    delivery_id: routable[loc - 1].id,
                    stop_order: pos as i32 + 1,
                })
                .collect();

            routes.push(RouteRecord {
                route_order: i as i32 + 1,
                vehicle_id: vehicles[assignment.vehicle % vehicles.len()].id,
                driver_id: drivers[i % drivers.len()].id,
                total_distance_km: assignment.distance_meters as f64 / 1000.0,
                estimated_duration_minutes: (assignment.duration_seconds / 60) as i32,
                status: "planned".to_string(),
                stops,
            });
        }

        let mut unassigned_delivery_ids: Vec<Uuid> = result
            .unassigned
            .iter()
            .map(|&loc| routable[loc - 1].id)
            .collect();
        unassigned_delivery_ids.extend(unroutable.iter().map(|d| d.id));

        let total_distance_km = result.total_distance_meters as f64 / 1000.0;
        let estimated_duration_minutes = (result.total_duration_seconds / 60) as i32;

        route::replace_batch_routes(
            &self.pool,
            batch_id,
            batch.delivery_date,
            &routes,
            total_distance_km,
            estimated_duration_minutes,
            Utc::now(),
        )
        .await
        .map_err(|e| match e.downcast::<sqlx::Error>() {
            Ok(db) => OptimizeError::Persistence(db),
            Err(other) => OptimizeError::Internal(other),
        })?;

        info!(
            "Batch {} optimized: {} routes, {:.1} km, {} unassigned",
            batch_id,
            routes.len(),
            total_distance_km,
            unassigned_delivery_ids.len()
        );

        Ok(OptimizationSummary {
            batch_id,
            routes,
            total_distance_km,
            estimated_duration_minutes,
            feasible: result.feasible && unroutable.is_empty(),
            unassigned_delivery_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    async fn test_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    fn optimizer(pool: &PgPool) -> BatchOptimizer {
        // No providers: any matrix request fails with MatrixUnavailable
        BatchOptimizer::new(
            pool.clone(),
            Arc::new(ProviderChain::new(vec![])),
            Duration::from_millis(200),
        )
    }

    async fn seed_batch(pool: &PgPool) -> (Uuid, Uuid) {
        let user_id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, email, name) VALUES ($1, $2, 'Test User')")
            .bind(user_id)
            .bind(format!("{}@test.local", user_id))
            .execute(pool)
            .await
            .unwrap();

        let batch_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO delivery_batches (id, user_id, name, delivery_date) \
             VALUES ($1, $2, 'Test batch', $3)",
        )
        .bind(batch_id)
        .bind(user_id)
        .bind(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap())
        .execute(pool)
        .await
        .unwrap();

        (user_id, batch_id)
    }

    async fn seed_fleet_and_delivery(pool: &PgPool, user_id: Uuid, batch_id: Uuid) {
        sqlx::query(
            "INSERT INTO vehicles (user_id, name, capacity_weight) VALUES ($1, 'Moto 1', 25.0)",
        )
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();

        sqlx::query("INSERT INTO drivers (user_id, name, phone) VALUES ($1, 'Pedro', '809-555-0001')")
            .bind(user_id)
            .execute(pool)
            .await
            .unwrap();

        let customer_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO customers (id, user_id, name, address) \
             VALUES ($1, $2, 'Cliente', 'Calle El Conde 105')",
        )
        .bind(customer_id)
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO deliveries (batch_id, customer_id, address, lat, lng, weight) \
             VALUES ($1, $2, 'Calle El Conde 105', 18.4718, -69.8923, 3.5)",
        )
        .bind(batch_id)
        .bind(customer_id)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn batch_status(pool: &PgPool, batch_id: Uuid) -> String {
        crate::db::queries::batch::get_batch(pool, batch_id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL"]
    async fn test_submit_without_vehicles_leaves_batch_draft() {
        let pool = test_pool().await;
        let (user_id, batch_id) = seed_batch(&pool).await;

        let err = optimizer(&pool)
            .submit(batch_id, user_id, false)
            .await
            .unwrap_err();

        assert!(matches!(err, OptimizeError::PreconditionNotMet(_)));
        assert_eq!(batch_status(&pool, batch_id).await, "draft");
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL"]
    async fn test_failed_run_marks_batch_failed_without_routes() {
        let pool = test_pool().await;
        let (user_id, batch_id) = seed_batch(&pool).await;
        seed_fleet_and_delivery(&pool, user_id, batch_id).await;

        let optimizer = optimizer(&pool);
        optimizer.submit(batch_id, user_id, false).await.unwrap();

        let err = optimizer.run(batch_id, user_id).await.unwrap_err();
        assert!(matches!(err, OptimizeError::MatrixUnavailable));
        assert_eq!(batch_status(&pool, batch_id).await, "failed");

        let (routes,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM routes WHERE batch_id = $1")
                .bind(batch_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(routes, 0);
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL"]
    async fn test_abandoned_batch_can_be_resubmitted() {
        let pool = test_pool().await;
        let (user_id, batch_id) = seed_batch(&pool).await;
        seed_fleet_and_delivery(&pool, user_id, batch_id).await;

        let optimizer = optimizer(&pool);
        optimizer.submit(batch_id, user_id, false).await.unwrap();

        // Enqueueing failed after the claim; the batch must not be stuck
        optimizer.abandon(batch_id).await;
        assert_eq!(batch_status(&pool, batch_id).await, "failed");

        optimizer.submit(batch_id, user_id, false).await.unwrap();
        assert_eq!(batch_status(&pool, batch_id).await, "optimizing");
    }
}
