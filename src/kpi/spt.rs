//! Standard Processing Time lookup tables.
//!
//! Both tables map a magnitude to a target duration in days. Buckets are
//! closed on the upper bound (`value <= bound`); anything above the last
//! bound falls in the open top bucket. The load table decreases with load
//! while the hours table increases with hours.

/// `(upper bound in kW, SPT days)`; above the last bound the SPT is [`LOAD_TOP_SPT`].
pub const LOAD_TABLE: [(f64, f64); 7] = [
    (50.0, 36.0),
    (100.0, 34.0),
    (200.0, 32.0),
    (300.0, 30.0),
    (400.0, 28.0),
    (500.0, 26.0),
    (1000.0, 23.0),
];
pub const LOAD_TOP_SPT: f64 = 20.0;

/// `(upper bound in labor-hours, SPT days)`; above the last bound the SPT is [`HOURS_TOP_SPT`].
pub const HOURS_TABLE: [(f64, f64); 9] = [
    (50.0, 20.0),
    (100.0, 23.0),
    (200.0, 26.0),
    (300.0, 28.0),
    (400.0, 30.0),
    (500.0, 32.0),
    (1000.0, 36.0),
    (1500.0, 40.0),
    (2000.0, 45.0),
];
pub const HOURS_TOP_SPT: f64 = 50.0;

fn lookup(table: &[(f64, f64)], top: f64, value: f64) -> f64 {
    table
        .iter()
        .find(|(bound, _)| value <= *bound)
        .map_or(top, |(_, spt)| *spt)
}

/// SPT in days for an applied load.
pub fn spt_by_applied_load(load: f64) -> f64 {
    lookup(&LOAD_TABLE, LOAD_TOP_SPT, load)
}

/// SPT in days for a labor-hours total.
pub fn spt_by_labor_hours(hours: f64) -> f64 {
    lookup(&HOURS_TABLE, HOURS_TOP_SPT, hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_boundaries() {
        assert_eq!(spt_by_applied_load(0.0), 36.0);
        assert_eq!(spt_by_applied_load(50.0), 36.0);
        assert_eq!(spt_by_applied_load(50.01), 34.0);
        assert_eq!(spt_by_applied_load(100.0), 34.0);
        assert_eq!(spt_by_applied_load(200.0), 32.0);
        assert_eq!(spt_by_applied_load(300.0), 30.0);
        assert_eq!(spt_by_applied_load(400.0), 28.0);
        assert_eq!(spt_by_applied_load(500.0), 26.0);
        assert_eq!(spt_by_applied_load(1000.0), 23.0);
        assert_eq!(spt_by_applied_load(1000.5), 20.0);
        assert_eq!(spt_by_applied_load(1e9), 20.0);
    }

    #[test]
    fn test_hours_boundaries() {
        assert_eq!(spt_by_labor_hours(0.0), 20.0);
        assert_eq!(spt_by_labor_hours(40.0), 20.0);
        assert_eq!(spt_by_labor_hours(50.0), 20.0);
        assert_eq!(spt_by_labor_hours(51.0), 23.0);
        assert_eq!(spt_by_labor_hours(500.0), 32.0);
        assert_eq!(spt_by_labor_hours(1000.0), 36.0);
        assert_eq!(spt_by_labor_hours(1500.0), 40.0);
        assert_eq!(spt_by_labor_hours(2000.0), 45.0);
        assert_eq!(spt_by_labor_hours(2000.1), 50.0);
    }

    #[test]
    fn test_negative_input_falls_in_first_bucket() {
        assert_eq!(spt_by_applied_load(-5.0), 36.0);
        assert_eq!(spt_by_labor_hours(-5.0), 20.0);
    }
}
