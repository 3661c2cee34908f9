use super::{log_event_on, ComplianceStore};
use crate::{
    error::{ComplianceError, ComplianceResult},
    event::ComplianceEvent,
    route::{Route, RouteFilter},
    types::Year,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

const ROUTE_COLUMNS: &str = "route_id, year, vessel_type, fuel_type, ghg_intensity,
     fuel_consumption, distance_km, total_emissions_t, is_baseline";

fn route_from_row(row: &Row<'_>) -> rusqlite::Result<Route> {
    Ok(Route {
        route_id: row.get(0)?,
        year: row.get(1)?,
        vessel_type: row.get(2)?,
        fuel_type: row.get(3)?,
        ghg_intensity: row.get(4)?,
        fuel_consumption: row.get(5)?,
        distance_km: row.get(6)?,
        total_emissions_t: row.get(7)?,
        is_baseline: row.get::<_, i32>(8)? != 0,
    })
}

impl ComplianceStore {
    // ── Routes ────────────────────────────────────────────────────

    /// Insert or replace a route. A route arriving with the baseline flag
    /// takes the baseline for its year. Audited as `RouteUpserted`.
    pub fn upsert_route(&self, route: &Route, at: DateTime<Utc>) -> ComplianceResult<()> {
        let tx = self.immediate()?;
        if route.is_baseline {
            tx.execute(
                "UPDATE route SET is_baseline = 0 WHERE year = ?1 AND route_id <> ?2",
                params![route.year, route.route_id],
            )?;
        }
        tx.execute(
            "INSERT OR REPLACE INTO route (
                route_id, year, vessel_type, fuel_type, ghg_intensity,
                fuel_consumption, distance_km, total_emissions_t, is_baseline
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                route.route_id,
                route.year,
                route.vessel_type,
                route.fuel_type,
                route.ghg_intensity,
                route.fuel_consumption,
                route.distance_km,
                route.total_emissions_t,
                route.is_baseline as i32,
            ],
        )?;
        log_event_on(
            &tx,
            &ComplianceEvent::RouteUpserted {
                route_id: route.route_id.clone(),
                year: route.year,
            },
            at,
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn routes(&self, filter: &RouteFilter) -> ComplianceResult<Vec<Route>> {
        let sql = format!(
            "SELECT {ROUTE_COLUMNS} FROM route
             WHERE (?1 IS NULL OR year = ?1)
               AND (?2 IS NULL OR vessel_type = ?2)
               AND (?3 IS NULL OR fuel_type = ?3)
             ORDER BY route_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![filter.year, filter.vessel_type, filter.fuel_type],
            route_from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn get_route(&self, route_id: &str) -> ComplianceResult<Option<Route>> {
        let sql = format!("SELECT {ROUTE_COLUMNS} FROM route WHERE route_id = ?1");
        let route = self
            .conn
            .query_row(&sql, params![route_id], route_from_row)
            .optional()?;
        Ok(route)
    }

    pub fn baseline_route(&self, year: Year) -> ComplianceResult<Option<Route>> {
        let sql = format!("SELECT {ROUTE_COLUMNS} FROM route WHERE year = ?1 AND is_baseline = 1");
        let route = self
            .conn
            .query_row(&sql, params![year], route_from_row)
            .optional()?;
        Ok(route)
    }

    /// Make `route_id` the baseline for its year, clearing any other
    /// baseline of that year in the same transaction. Audited as
    /// `BaselineChanged`.
    pub fn set_baseline(&self, route_id: &str, at: DateTime<Utc>) -> ComplianceResult<Route> {
        let tx = self.immediate()?;
        let year: Option<Year> = tx
            .query_row(
                "SELECT year FROM route WHERE route_id = ?1",
                params![route_id],
                |row| row.get(0),
            )
            .optional()?;
        let year = year.ok_or_else(|| ComplianceError::NotFound {
            what: "route",
            key: route_id.to_string(),
        })?;
        tx.execute(
            "UPDATE route SET is_baseline = 0 WHERE year = ?1 AND is_baseline = 1",
            params![year],
        )?;
        tx.execute(
            "UPDATE route SET is_baseline = 1 WHERE route_id = ?1",
            params![route_id],
        )?;
        log_event_on(
            &tx,
            &ComplianceEvent::BaselineChanged {
                route_id: route_id.to_string(),
                year,
            },
            at,
        )?;
        tx.commit()?;

        self.get_route(route_id)?.ok_or_else(|| ComplianceError::NotFound {
            what: "route",
            key: route_id.to_string(),
        })
    }

    pub fn baseline_count(&self, year: Year) -> ComplianceResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM route WHERE year = ?1 AND is_baseline = 1",
            params![year],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
