//! Self-consistency checks of calibration tables.
//!
//! Slots left at their default must accept everything. Every calibrated slot
//! must reject predictions far outside any physical range and accept a point
//! just inside each branch, while rejecting points just beyond the outer
//! bounds of both branches. The invalid-key slot is not checked.

use cluster_shape::{
    PixelKey, PixelLimits, PixelLimitsCollection, StripKey, StripLimits, StripLimitsCollection,
};
use serde::Serialize;

/// Prediction no calibrated slot may accept
pub const FAR_OUT: f32 = 10e12;
/// Distance of inside/outside probes from a bound
pub const EPS: f32 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub table: &'static str,
    pub slot: usize,
    pub check: &'static str,
    pub probe: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckReport {
    pub pixel_slots: usize,
    pub strip_slots: usize,
    pub calibrated_pixel_slots: usize,
    pub calibrated_strip_slots: usize,
    pub violations: Vec<Violation>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

pub fn check_tables(pixel: &PixelLimitsCollection, strip: &StripLimitsCollection) -> CheckReport {
    let mut report = CheckReport {
        pixel_slots: pixel.size(),
        strip_slots: strip.size(),
        ..Default::default()
    };
    check_pixel(pixel, &mut report);
    check_strip(strip, &mut report);
    report
}

fn check_pixel(table: &PixelLimitsCollection, report: &mut CheckReport) {
    for (slot, limits) in table.iter().enumerate().take(PixelKey::N) {
        let mut expect = |check: &'static str, probe: (f32, f32), inside: bool| {
            if limits.is_inside(probe) != inside {
                report.violations.push(Violation {
                    table: "pixel",
                    slot,
                    check,
                    probe: vec![probe.0, probe.1],
                });
            }
        };

        if *limits == PixelLimits::default() {
            expect("default_accepts_far_out", (FAR_OUT, -FAR_OUT), true);
            continue;
        }

        expect("far_out_rejected", (FAR_OUT, FAR_OUT), false);
        expect("far_out_rejected", (-FAR_OUT, -FAR_OUT), false);

        let [[x0, y0], [x1, y1]] = limits.data;

        expect("inside_branch_0", (x0[0] + EPS, y0[1] - EPS), true);
        expect("inside_branch_1", (x1[1] - EPS, y1[0] + EPS), true);

        let mid_x = 0.5 * (x0[0] + x0[1]);
        let mid_y = 0.5 * (y0[0] + y0[1]);
        expect("beyond_x_rejected", (x0[1].max(x1[1]) + EPS, mid_y), false);
        expect("beyond_y_rejected", (mid_x, y0[1].max(y1[1]) + EPS), false);
        expect("below_y_rejected", (mid_x, y0[0].min(y1[0]) - EPS), false);

        report.calibrated_pixel_slots += 1;
    }
}

fn check_strip(table: &StripLimitsCollection, report: &mut CheckReport) {
    for (slot, limits) in table.iter().enumerate().take(StripKey::N) {
        let mut expect = |check: &'static str, probe: f32, inside: bool| {
            if limits.is_inside(probe) != inside {
                report.violations.push(Violation {
                    table: "strip",
                    slot,
                    check,
                    probe: vec![probe],
                });
            }
        };

        if *limits == StripLimits::default() {
            expect("default_accepts_far_out", FAR_OUT, true);
            expect("default_accepts_far_out", -FAR_OUT, true);
            continue;
        }

        expect("far_out_rejected", FAR_OUT, false);
        expect("far_out_rejected", -FAR_OUT, false);

        let [b0, b1] = limits.data;

        expect("inside_branch_0", b0[0] + EPS, true);
        expect("inside_branch_1", b1[1] - EPS, true);
        expect("beyond_rejected", b0[1].max(b1[1]) + EPS, false);
        expect("below_rejected", b0[0].min(b1[0]) - EPS, false);

        report.calibrated_strip_slots += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(records: &str) -> PixelLimitsCollection {
        PixelLimitsCollection::from_reader(records.as_bytes(), "test").unwrap()
    }

    fn strip(records: &str) -> StripLimitsCollection {
        StripLimitsCollection::from_reader(records.as_bytes(), "test").unwrap()
    }

    #[test]
    fn test_default_tables_are_clean() {
        let report = check_tables(&pixel(""), &strip(""));
        assert!(report.is_clean());
        assert_eq!(report.pixel_slots, 193);
        assert_eq!(report.strip_slots, 41);
        assert_eq!(report.calibrated_pixel_slots, 0);
    }

    #[test]
    fn test_well_formed_records() {
        let report = check_tables(
            &pixel("0 3 2 1.6 3.6 0.6 2.6 -3.6 -1.6 0.6 2.6 0.5 167 0.5 127\n"),
            &strip("4 1.8 4.3 -4.3 -1.8\n"),
        );
        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.calibrated_pixel_slots, 1);
        assert_eq!(report.calibrated_strip_slots, 1);
    }

    #[test]
    fn test_invalid_slot_is_not_checked() {
        // width 50 is keyed to the invalid slot
        let report = check_tables(&pixel(""), &strip("50 2.0 2.0 -4.0 -1.0\n"));
        assert!(report.is_clean());
        assert_eq!(report.calibrated_strip_slots, 0);
    }

    #[test]
    fn test_unbounded_record_is_reported() {
        // branch 1 reaches past any physical prediction
        let report = check_tables(
            &pixel("0 1 1 0.0 2.0 0.0 2.0 -2.0 1e14 0.0 1e14 0.5 10 0.5 10\n"),
            &strip(""),
        );
        assert!(!report.is_clean());
        assert!(report
            .violations
            .iter()
            .all(|v| v.table == "pixel" && v.slot == 17));
        assert!(report.violations.iter().any(|v| v.check == "far_out_rejected"));
    }

    #[test]
    fn test_empty_interval_is_reported() {
        let report = check_tables(&pixel(""), &strip("3 2.0 2.0 -4.0 -1.0\n"));
        let checks: Vec<_> = report.violations.iter().map(|v| v.check).collect();
        assert_eq!(checks, ["inside_branch_0"]);
    }

    #[test]
    fn test_report_serializes() {
        let report = check_tables(&pixel(""), &strip("3 2.0 2.0 -4.0 -1.0\n"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["strip_slots"], 41);
        assert_eq!(json["violations"][0]["table"], "strip");
        assert_eq!(json["violations"][0]["slot"], 2);
    }
}
