use cluster_shape::geometry::{
    ConstantLorentzAngle, GlobalPoint, GlobalVector, InMemoryTracker, LocalPoint, LocalVector,
    PixelDetUnit, StripDetUnit, StripTopology, Subdetector, Surface, UniformField,
};
use cluster_shape::{
    ClusterShapeError, ClusterShapeHitFilter, DetId, FilterConfig, PixelClusterShape, PixelKey,
    PixelLimits, PixelLimitsCollection, PixelRecHit, StripCluster, StripKey, StripLimits,
    StripLimitsCollection, TrackDirection, TripletFilter,
};
use nalgebra::{Rotation3, Vector3};
use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

const OUT: f32 = 10e12;
const EPS: f32 = 0.01;

const BARREL: DetId = DetId(101);
const ENDCAP: DetId = DetId(201);
const ROTATED: DetId = DetId(102);
const STRIP: DetId = DetId(301);

/// Pixel elements with thickness == pitch (unit cotangent) unless a field is given
fn tracker() -> InMemoryTracker {
    let mut tracker = InMemoryTracker::new();
    tracker.add_pixel(PixelDetUnit {
        id: BARREL,
        subdetector: Subdetector::PixelBarrel,
        surface: Surface::new(GlobalPoint::new(4.4, 0.0, 0.0), Rotation3::identity()),
        thickness: 0.015,
        pitch: (0.015, 0.015),
    });
    tracker.add_pixel(PixelDetUnit {
        id: ROTATED,
        subdetector: Subdetector::PixelBarrel,
        surface: Surface::new(
            GlobalPoint::new(0.0, 7.3, 2.0),
            Rotation3::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2),
        ),
        thickness: 0.015,
        pitch: (0.015, 0.015),
    });
    tracker.add_pixel(PixelDetUnit {
        id: ENDCAP,
        subdetector: Subdetector::PixelEndcap,
        surface: Surface::new(GlobalPoint::new(0.0, 10.0, 34.5), Rotation3::identity()),
        thickness: 0.015,
        pitch: (0.015, 0.015),
    });
    tracker.add_strip(StripDetUnit {
        id: STRIP,
        subdetector: Subdetector::StripBarrel,
        surface: Surface::new(GlobalPoint::new(25.0, 0.0, 0.0), Rotation3::identity()),
        thickness: 0.032,
        topology: StripTopology::Rectangular {
            pitch: 0.032,
            nstrips: 512,
        },
    });
    tracker
}

fn build(config: &FilterConfig) -> ClusterShapeHitFilter {
    ClusterShapeHitFilter::new(
        config,
        &tracker(),
        &UniformField(GlobalVector::zeros()),
        &ConstantLorentzAngle(0.0),
        &ConstantLorentzAngle(0.0),
    )
    .unwrap()
}

fn pixel_hit(det_id: DetId, sizes: Vec<(i32, i32)>) -> PixelRecHit {
    PixelRecHit {
        det_id,
        local_position: LocalPoint::origin(),
        charge: 25000.0,
        shape: PixelClusterShape::new(sizes),
    }
}

#[test]
fn test_strip_limits_table() {
    let config = FilterConfig::default();
    let limits = StripLimitsCollection::load(config.strip_shape_path().unwrap()).unwrap();

    for i in 0..StripKey::N {
        let l = limits.get(i).unwrap();
        if *l == StripLimits::default() {
            assert!(l.is_inside(OUT), "slot {i}");
            assert!(l.is_inside(-OUT), "slot {i}");
            continue;
        }
        assert!(!l.is_inside(OUT), "slot {i}");
        assert!(!l.is_inside(-OUT), "slot {i}");

        let [b0, b1] = l.data;
        assert!(l.is_inside(b0[0] + EPS), "slot {i}");
        assert!(l.is_inside(b1[1] - EPS), "slot {i}");
        let upper = b0[1].max(b1[1]);
        let lower = b0[0].min(b1[0]);
        assert!(!l.is_inside(upper + EPS), "slot {i}");
        assert!(!l.is_inside(lower - EPS), "slot {i}");
    }
}

#[test]
fn test_pixel_limits_table() {
    let config = FilterConfig::default();
    let limits = PixelLimitsCollection::load(config.pixel_shape_path().unwrap()).unwrap();

    for i in 0..PixelKey::N {
        let l = limits.get(i).unwrap();
        if *l == PixelLimits::default() {
            assert!(l.is_inside((OUT, OUT)), "slot {i}");
            assert!(l.is_inside((-OUT, -OUT)), "slot {i}");
            continue;
        }
        assert!(!l.is_inside((OUT, OUT)), "slot {i}");
        assert!(!l.is_inside((-OUT, -OUT)), "slot {i}");

        let [[x0, y0], [x1, y1]] = l.data;
        assert!(l.is_inside((x0[0] + EPS, y0[1] - EPS)), "slot {i}");
        assert!(l.is_inside((x1[1] - EPS, y1[0] + EPS)), "slot {i}");

        let mid_y = 0.5 * (y0[0] + y0[1]);
        let mid_x = 0.5 * (x0[0] + x0[1]);
        assert!(!l.is_inside((x0[1].max(x1[1]) + EPS, mid_y)), "slot {i}");
        assert!(!l.is_inside((mid_x, y0[1].max(y1[1]) + EPS)), "slot {i}");
        assert!(!l.is_inside((mid_x, y0[0].min(y1[0]) - EPS)), "slot {i}");
    }
}

#[test]
fn test_unloaded_slots_accept_everything() {
    let config = FilterConfig::default();
    let pixel = PixelLimitsCollection::load(config.pixel_shape_path().unwrap()).unwrap();
    let strip = StripLimitsCollection::load(config.strip_shape_path().unwrap()).unwrap();

    // shapes the bundled calibration leaves out
    for key in [PixelKey::new(0, 7, 14), PixelKey::INVALID] {
        assert!(pixel[key].is_inside((0.0, 0.0)));
        assert!(pixel[key].is_inside((-1e12, 1e12)));
        assert!(pixel[key].is_inside((OUT, -OUT)));
    }
    for key in [StripKey::new(30), StripKey::INVALID] {
        assert!(strip[key].is_inside(1e12));
        assert!(strip[key].is_inside(-OUT));
    }
}

#[test]
fn test_uncalibrated_width_accepts_grazing_track() {
    let filter = build(&FilterConfig::default());
    // width 30 has no record in the bundled strip calibration
    let cluster = StripCluster::new(100, vec![50; 30]);
    let grazing = LocalVector::new(1.0, 0.0, 1e-12);
    assert!(filter
        .is_compatible_strip_dir(STRIP, &cluster, &grazing)
        .unwrap());

    // same direction, calibrated width
    let cluster = StripCluster::new(100, vec![50; 4]);
    assert!(!filter
        .is_compatible_strip_dir(STRIP, &cluster, &grazing)
        .unwrap());
}

#[test]
fn test_prediction_at_region_midpoint_is_accepted() {
    let filter = build(&FilterConfig::default());
    let key = PixelKey::new(0, 3, 2);
    let limit = filter.pixel_limits()[key].limit(0);
    let mid_x = 0.5 * (limit.low[0] + limit.high[0]);
    let mid_y = 0.5 * (limit.low[1] + limit.high[1]);

    let hit = pixel_hit(BARREL, vec![(3, 2)]);
    let ldir = LocalVector::new(mid_x, mid_y, 1.0);
    assert!(filter.is_compatible_pixel(&hit, &ldir, None).unwrap());

    // straight through the sensor cannot make a 3 x 2 cluster
    assert!(!filter
        .is_compatible_pixel(&hit, &LocalVector::z(), None)
        .unwrap());
}

#[test]
fn test_out_of_range_shape_is_accepted() {
    let filter = build(&FilterConfig::default());
    let hit = pixel_hit(BARREL, vec![(20, 1)]);

    for ldir in [
        LocalVector::z(),
        LocalVector::new(50.0, -3.0, 1.0),
        LocalVector::new(0.1, 0.1, -0.01),
    ] {
        assert!(filter.is_compatible_pixel(&hit, &ldir, None).unwrap());
    }

    let (_, trace) = filter
        .is_compatible_pixel_traced(&hit, &LocalVector::z(), None)
        .unwrap();
    assert!(trace.has_invalid_key);
    assert_eq!(trace.limits[0].limit_key, PixelKey::N as u32);
}

#[test]
fn test_disabled_shape_cut_ignores_shape_and_direction() {
    let config = FilterConfig {
        cut_on_pixel_shape: false,
        cut_on_strip_shape: false,
        ..Default::default()
    };
    let filter = build(&config);

    for sizes in [vec![(3, 2)], vec![(0, 0)], vec![(10, 2), (1, 1)]] {
        let hit = pixel_hit(BARREL, sizes);
        for ldir in [LocalVector::z(), LocalVector::new(8.0, 8.0, 1.0)] {
            assert!(filter.is_compatible_pixel(&hit, &ldir, None).unwrap());
        }
    }

    let cluster = StripCluster::new(100, vec![80; 5]);
    assert!(filter
        .is_compatible_strip_dir(STRIP, &cluster, &LocalVector::z())
        .unwrap());
}

#[test]
fn test_empty_strip_cluster_is_not_usable() {
    let filter = build(&FilterConfig::default());
    let cluster = StripCluster::new(10, vec![]);
    let sizes = filter
        .strip_sizes(STRIP, &cluster, &LocalPoint::origin(), &LocalVector::z())
        .unwrap();
    assert!(!sizes.usable);
    assert_eq!(sizes.width, 0);
    assert!(filter
        .is_compatible_strip_dir(STRIP, &cluster, &LocalVector::new(9.0, 0.0, 1.0))
        .unwrap());
}

#[test]
fn test_strip_width_against_direction() {
    let filter = build(&FilterConfig::default());
    let cluster = StripCluster::new(100, vec![60, 90, 90, 60]);

    // width 4 expects a predicted width in (1.8, 4.3) or its mirror
    assert!(filter
        .is_compatible_strip_dir(STRIP, &cluster, &LocalVector::new(3.0, 0.0, 1.0))
        .unwrap());
    assert!(filter
        .is_compatible_strip_dir(STRIP, &cluster, &LocalVector::new(-3.0, 0.0, 1.0))
        .unwrap());
    assert!(!filter
        .is_compatible_strip_dir(STRIP, &cluster, &LocalVector::z())
        .unwrap());
}

#[test]
fn test_decision_is_idempotent() {
    let filter = build(&FilterConfig::default());
    let hit = pixel_hit(BARREL, vec![(3, 2), (2, 2)]);
    let ldir = LocalVector::new(2.2, 1.7, 1.0);

    let first = filter.is_compatible_pixel_traced(&hit, &ldir, None).unwrap();
    let second = filter.is_compatible_pixel_traced(&hit, &ldir, None).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.0, filter.is_compatible_pixel(&hit, &ldir, None).unwrap());
}

#[test]
fn test_trace_contents() {
    let filter = build(&FilterConfig::default());
    let hit = pixel_hit(ENDCAP, vec![(1, -2), (2, -2)]);
    let ldir = LocalVector::new(1.0, -2.0, 1.0);

    let (compatible, trace) = filter.is_compatible_pixel_traced(&hit, &ldir, None).unwrap();
    assert!(compatible);
    assert_eq!(trace.det_id, Some(ENDCAP));
    assert_eq!(trace.part, 1);
    assert!(trace.usable);
    assert_eq!(trace.cluster_sizes, vec![[1, -2], [2, -2]]);
    assert_eq!(trace.pred, [1.0, 2.0]);
    assert_eq!(trace.local_direction, [1.0, -2.0, 1.0]);
    assert_eq!(trace.limits.len(), 2);
    assert_eq!(trace.limits[0].limit_key, u32::from(PixelKey::new(1, 1, 2)));
    assert!(trace.limits[0].pred_inside_limits);
    assert!(trace.has_pred_inside_limits);
    assert!(!trace.has_invalid_key);

    let json = serde_json::to_value(&trace).unwrap();
    assert_eq!(json["compatible"], true);
    assert_eq!(json["limits"][0]["limit_key_valid"], true);
}

#[test]
fn test_trace_of_gated_hit_is_partial() {
    let config = FilterConfig {
        cut_on_pixel_charge: true,
        min_good_pixel_charge: 1.0e9,
        ..Default::default()
    };
    let filter = build(&config);
    let hit = pixel_hit(BARREL, vec![(3, 2)]);
    let (compatible, trace) = filter
        .is_compatible_pixel_traced(&hit, &LocalVector::z(), None)
        .unwrap();
    assert!(!compatible);
    assert_eq!(trace.det_id, Some(BARREL));
    assert!(trace.cluster_sizes.is_empty());
    assert!(trace.limits.is_empty());
}

#[test]
fn test_global_direction_matches_local() {
    let filter = build(&FilterConfig::default());
    let hit = pixel_hit(ROTATED, vec![(3, 2)]);
    let surface = &filter.geometry().pixel(ROTATED).unwrap().det.surface;

    for ldir in [
        LocalVector::new(2.6, 1.6, 1.0),
        LocalVector::new(0.1, 0.2, 1.0),
        LocalVector::new(-2.5, 1.5, 1.0),
    ] {
        let gdir = surface.to_global_vector(&ldir);
        assert_eq!(
            filter.is_compatible_pixel_global(&hit, &gdir, None).unwrap(),
            filter.is_compatible_pixel(&hit, &ldir, None).unwrap()
        );
    }
}

#[test]
fn test_drift_and_cotangent_enter_prediction() {
    let field = UniformField(GlobalVector::new(0.0, 0.0, 3.8));
    let filter = ClusterShapeHitFilter::new(
        &FilterConfig::default(),
        &tracker(),
        &field,
        &ConstantLorentzAngle(0.1),
        &ConstantLorentzAngle(0.02),
    )
    .unwrap();

    let pd = filter.geometry().pixel(ROTATED).unwrap();
    let b = pd.det.surface.to_local_vector(&field.0);
    assert!((pd.drift.0 + 0.1 * b.y).abs() < 1e-5);
    assert!((pd.drift.1 - 0.1 * b.x).abs() < 1e-5);

    let hit = pixel_hit(ROTATED, vec![(3, 2)]);
    let ldir = LocalVector::new(2.0, 1.0, 1.0);
    let sizes = filter.pixel_sizes(&hit, &ldir, None).unwrap();
    assert!((sizes.pred.0 - (2.0 + pd.drift.0) * pd.cotangent.0).abs() < 1e-5);
    assert!((sizes.pred.1 - (1.0 + pd.drift.1) * pd.cotangent.1).abs() < 1e-5);
}

#[test]
fn test_missing_calibration_fails_construction() {
    let config = FilterConfig {
        pixel_shape_file: "no_such_pixelShape.par".to_string(),
        ..Default::default()
    };
    let result = ClusterShapeHitFilter::new(
        &config,
        &tracker(),
        &UniformField(GlobalVector::zeros()),
        &ConstantLorentzAngle(0.0),
        &ConstantLorentzAngle(0.0),
    );
    assert!(matches!(
        result,
        Err(ClusterShapeError::CalibrationNotFound { .. })
    ));
}

#[test]
fn test_shared_across_threads() {
    let filter = Arc::new(build(&FilterConfig::default()));
    let hit = pixel_hit(BARREL, vec![(3, 2)]);
    let dirs: Vec<LocalVector> = (0..32)
        .map(|i| LocalVector::new(i as f32 * 0.2, 1.6, 1.0))
        .collect();
    let expected: Vec<bool> = dirs
        .iter()
        .map(|d| filter.is_compatible_pixel(&hit, d, None).unwrap())
        .collect();

    std::thread::scope(|s| {
        for _ in 0..4 {
            let filter = Arc::clone(&filter);
            let (hit, dirs, expected) = (&hit, &dirs, &expected);
            s.spawn(move || {
                let got: Vec<bool> = dirs
                    .iter()
                    .map(|d| filter.is_compatible_pixel(hit, d, None).unwrap())
                    .collect();
                assert_eq!(&got, expected);
            });
        }
    });
}

#[test]
fn test_triplet_check_track() {
    let filter = build(&FilterConfig::default());
    let triplet = TripletFilter::new(&filter);
    let good = pixel_hit(BARREL, vec![(3, 2)]);
    let surface = &filter.geometry().pixel(BARREL).unwrap().det.surface;
    let ldir = LocalVector::new(2.6, 1.6, 1.0);
    let gdir = surface.to_global_vector(&ldir);

    let dirs = [TrackDirection::Local(ldir), TrackDirection::Global(gdir)];
    assert!(triplet.check_track(&[Some(&good), Some(&good)], &dirs).unwrap());
    assert!(!triplet.check_track(&[Some(&good), None], &dirs).unwrap());

    let bad_dirs = [TrackDirection::Local(ldir), TrackDirection::Local(LocalVector::z())];
    assert!(!triplet
        .check_track(&[Some(&good), Some(&good)], &bad_dirs)
        .unwrap());
}
