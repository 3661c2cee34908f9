//! Shared primitive types and tolerances used across the desk.

/// A vessel identifier. Vessels are keyed by their voyage record's route id.
pub type VesselId = String;

/// A compliance (reporting) year.
pub type Year = i64;

/// A signed compliance quantity in grams of CO₂ equivalent.
pub type Gco2e = f64;

/// Balance checks treat shortfalls smaller than this as zero.
pub const BALANCE_TOLERANCE: f64 = 1e-9;

/// Unmet deficit need above this after allocation is an allocator fault.
pub const ALLOCATION_TOLERANCE: f64 = 1e-6;

/// Pool checks widen the absolute tolerances by this fraction of the pool's
/// total magnitude, so rounding at 1e8..1e9 gCO₂e does not reject a pool.
pub const RELATIVE_TOLERANCE: f64 = 1e-12;
