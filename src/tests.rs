//! Scenario tests for the propagation engine.

use crate::{
    DISTANCE_TICKS, Area, DecayCurve, DecayModel, EngineConfig, LightEngine, LightMap, Resolution,
    Rgb, TileClass,
};

/// Baseline test configuration: everything optional off, modest range.
fn test_config(resolution: Resolution, max_light_range: usize, workers: usize) -> EngineConfig {
    EngineConfig {
        resolution,
        workers,
        max_light_range,
        temporal: false,
        bounce_light: false,
        hi_def: false,
        ..EngineConfig::default()
    }
}

fn engine(config: EngineConfig) -> LightEngine {
    LightEngine::new(config).expect("engine construction should succeed")
}

/// A small cave scene: border walls, an interior pillar, two torches.
fn cave_scene(width: usize, height: usize) -> LightMap {
    let mut map = LightMap::new(width, height);
    for x in 0..width {
        map.set_class(x, 0, TileClass::Solid);
        map.set_class(x, height - 1, TileClass::Solid);
    }
    for y in 0..height {
        map.set_class(0, y, TileClass::Solid);
        map.set_class(width - 1, y, TileClass::Solid);
    }
    for y in height / 3..2 * height / 3 {
        map.set_class(width / 2, y, TileClass::Solid);
    }
    map.set_color(2, 2, Rgb::new(1.0, 0.8, 0.4));
    map.set_color(width - 3, height - 3, Rgb::new(0.3, 0.5, 1.0));
    map
}

#[test]
fn test_main() {
    crate::main();
}

#[test]
fn test_propagation_never_darkens() {
    // Ambient glow everywhere plus torches: every cell must come out
    // component-wise >= its pre-propagation value.
    let mut map = cave_scene(16, 12);
    for color in map.colors_mut() {
        *color = color.max(Rgb::new(0.02, 0.02, 0.02));
    }
    let before = map.colors().to_vec();

    engine(test_config(Resolution::X2, 16, 2))
        .spread_light(&mut map)
        .expect("propagation");

    for (i, (&after, &before)) in map.colors().iter().zip(&before).enumerate() {
        assert!(
            after.r >= before.r && after.g >= before.g && after.b >= before.b,
            "cell {i} darkened: {before:?} -> {after:?}"
        );
    }
}

#[test]
fn test_deterministic_across_worker_counts() {
    let reference = {
        let mut map = cave_scene(24, 18);
        engine(test_config(Resolution::X4, 16, 1))
            .spread_light(&mut map)
            .expect("propagation");
        map.colors().to_vec()
    };

    for workers in [2usize, 8] {
        let mut map = cave_scene(24, 18);
        engine(test_config(Resolution::X4, 16, workers))
            .spread_light(&mut map)
            .expect("propagation");
        // Max-blend is commutative and associative and every worker computes
        // the same per-source values, so the match is exact, not approximate.
        assert_eq!(
            map.colors(),
            &reference[..],
            "output depends on worker count {workers}"
        );
    }
}

#[test]
fn test_isolation_dim_source() {
    // 0.05 white through the 0.91 air curve drops below the 0.04 range
    // cutoff after a single tile, so nothing farther than distance 1 may
    // receive light.
    let mut map = LightMap::new(31, 31);
    map.set_color(15, 15, Rgb::new(0.05, 0.05, 0.05));

    engine(test_config(Resolution::X2, 64, 2))
        .spread_light(&mut map)
        .expect("propagation");

    assert!(map.color(15, 14).r > 0.0, "axis neighbor should be lit");
    for x in 0..31usize {
        for y in 0..31usize {
            let dx = x.abs_diff(15);
            let dy = y.abs_diff(15);
            if dx * dx + dy * dy > 1 {
                let c = map.color(x, y);
                assert_eq!(
                    (c.r, c.g, c.b),
                    (0.0, 0.0, 0.0),
                    "light escaped to ({x}, {y})"
                );
            }
        }
    }
}

#[test]
fn test_isolation_range_clamp() {
    // A bright source is still bounded by the configured maximum range.
    let max_range = 6usize;
    let mut map = LightMap::new(31, 31);
    map.set_color(15, 15, Rgb::WHITE);

    engine(test_config(Resolution::X2, max_range, 2))
        .spread_light(&mut map)
        .expect("propagation");

    assert!(map.color(15, 15 - max_range).r > 0.0);
    for x in 0..31usize {
        for y in 0..31usize {
            let dx = x.abs_diff(15);
            let dy = y.abs_diff(15);
            if dx * dx + dy * dy > max_range * max_range {
                let c = map.color(x, y);
                assert_eq!(
                    (c.r, c.g, c.b),
                    (0.0, 0.0, 0.0),
                    "light escaped the radius at ({x}, {y})"
                );
            }
        }
    }
}

#[test]
fn test_full_occlusion_at_total_exit_loss() {
    // One-tile-thick solid wall, 100% exit loss: the straight axis through
    // the wall is completely dark on the far side, however bright the source.
    let mut config = test_config(Resolution::X2, 16, 1);
    config.exit_loss_percent = 100.0;

    let mut map = LightMap::new(12, 11);
    for y in 0..11 {
        map.set_class(4, y, TileClass::Solid);
    }
    map.set_color(2, 5, Rgb::new(100.0, 100.0, 100.0));

    engine(config).spread_light(&mut map).expect("propagation");

    assert!(map.color(3, 5).r > 0.0, "near side of the wall should be lit");
    assert!(map.color(4, 5).r > 0.0, "the wall tile itself absorbs light");
    for x in 5..12 {
        let c = map.color(x, 5);
        assert_eq!(
            (c.r, c.g, c.b),
            (0.0, 0.0, 0.0),
            "light leaked through the wall to ({x}, 5)"
        );
    }
}

#[test]
fn test_partial_blockers_dim_but_pass() {
    let lit = |class: TileClass| {
        let mut map = LightMap::new(11, 5);
        map.set_class(4, 2, class);
        map.set_color(2, 2, Rgb::WHITE);
        engine(test_config(Resolution::X1, 8, 1))
            .spread_light(&mut map)
            .expect("propagation");
        map.color(6, 2).r
    };

    let through_air = lit(TileClass::Air);
    let through_water = lit(TileClass::Water);
    let through_murk = lit(TileClass::Murk);
    println!("through air: {through_air:.4}, water: {through_water:.4}, murk: {through_murk:.4}");

    assert!(through_water > 0.0 && through_murk > 0.0);
    assert!(through_water < through_air);
    assert!(through_murk < through_water, "murk blocks harder than water");
}

#[test]
fn test_bounce_pass_is_noop_on_dark_map() {
    let mut config = test_config(Resolution::X2, 16, 2);
    config.bounce_light = true;
    config.bounce_iterations = 6;

    let mut map = cave_scene(16, 12);
    for color in map.colors_mut() {
        *color = Rgb::ZERO;
    }

    engine(config).spread_light(&mut map).expect("propagation");

    assert!(
        map.colors().iter().all(|c| *c == Rgb::ZERO),
        "bounce light invented light on an all-dark map"
    );
}

#[test]
fn test_bounce_pass_never_darkens() {
    let direct = {
        let mut map = cave_scene(20, 14);
        engine(test_config(Resolution::X2, 16, 2))
            .spread_light(&mut map)
            .expect("propagation");
        map.colors().to_vec()
    };

    let mut config = test_config(Resolution::X2, 16, 2);
    config.bounce_light = true;
    let mut map = cave_scene(20, 14);
    engine(config).spread_light(&mut map).expect("propagation");

    for (i, (&bounced, &plain)) in map.colors().iter().zip(&direct).enumerate() {
        assert!(
            bounced.r >= plain.r && bounced.g >= plain.g && bounced.b >= plain.b,
            "bounce darkened cell {i}"
        );
    }
}

#[test]
fn test_five_by_five_reference_scenario() {
    // 5x5 open grid, white source at the center, max range 2, and a linear
    // open-air curve scaled so one full tile halves the light.
    let mut light_engine = engine(test_config(Resolution::X4, 2, 1));
    let linear_air = DecayCurve::from_fn(|t| 1.0 - t as f32 / (2.0 * DISTANCE_TICKS as f32));
    light_engine.set_decay_model(DecayModel::from_curves(
        linear_air,
        DecayCurve::exponential(0.56),
        DecayCurve::exponential(0.88),
        DecayCurve::exponential(0.64),
        50.0,
    ));

    let mut map = LightMap::new(5, 5);
    map.set_color(2, 2, Rgb::WHITE);
    light_engine.spread_light(&mut map).expect("propagation");

    for y in 0..5 {
        for x in 0..5 {
            print!("{:5.3} ", map.color(x, y).r);
        }
        println!();
    }

    // The source keeps its own brightness.
    assert_eq!(map.color(2, 2), Rgb::WHITE);

    // One full tile of attenuation on the four axis neighbors, exactly.
    let half = map.color(2, 2).r * 0.5;
    for (x, y) in [(1, 2), (3, 2), (2, 1), (2, 3)] {
        assert_eq!(map.color(x, y).r, half, "axis cell ({x}, {y})");
        assert_eq!(map.color(x, y).g, half);
    }
    // Two full tiles at axis distance 2.
    for (x, y) in [(0, 2), (4, 2), (2, 0), (2, 4)] {
        assert_eq!(map.color(x, y).r, 0.25, "axis cell ({x}, {y})");
    }

    // Diagonal neighbors sit at Euclidean distance sqrt(2): dimmer than the
    // axis neighbors, but not dark - the quadrant sweep reaches them.
    let diagonal = map.color(1, 1).r;
    assert!(diagonal > 0.0, "diagonal should receive light");
    assert!(
        diagonal < half,
        "diagonal {diagonal} should be dimmer than axis {half}"
    );
    for (x, y) in [(3, 1), (1, 3), (3, 3)] {
        assert_eq!(map.color(x, y).r, diagonal, "quadrants should be symmetric");
    }
}

#[test]
fn test_temporal_static_scene_is_stable() {
    let mut config = test_config(Resolution::X2, 16, 2);
    config.temporal = true;
    let mut light_engine = engine(config);

    // The host refreshes emissions every frame; the scene itself is static.
    let mut first = cave_scene(20, 14);
    light_engine.spread_light(&mut first).expect("frame 1");

    let mut second = cave_scene(20, 14);
    light_engine.spread_light(&mut second).expect("frame 2");

    assert_eq!(
        first.colors(),
        second.colors(),
        "static scene must reproduce exactly with temporal reuse on"
    );
}

#[test]
fn test_area_restriction_limits_sources() {
    let mut map = LightMap::new(20, 10);
    map.set_color(3, 5, Rgb::WHITE);
    map.set_color(15, 5, Rgb::WHITE);

    let mut light_engine = engine(test_config(Resolution::X2, 8, 2));
    light_engine.set_area(Some(Area::new(0, 0, 8, 10)));
    light_engine.spread_light(&mut map).expect("propagation");

    assert!(map.color(4, 5).r > 0.0, "in-area source should propagate");
    let skipped = map.color(14, 5);
    assert_eq!(
        (skipped.r, skipped.g, skipped.b),
        (0.0, 0.0, 0.0),
        "out-of-area source must not propagate"
    );
    // The skipped source keeps its own emission untouched.
    assert_eq!(map.color(15, 5), Rgb::WHITE);
}

#[test]
fn test_degenerate_grid_is_a_safe_noop() {
    let mut empty = LightMap::new(0, 0);
    let result = engine(test_config(Resolution::X1, 8, 1)).spread_light(&mut empty);
    assert!(result.is_err(), "zero-sized grid must signal fallback");

    let mut flat = LightMap::new(5, 0);
    assert!(
        engine(test_config(Resolution::X1, 8, 1))
            .spread_light(&mut flat)
            .is_err()
    );
}

#[test]
fn test_hi_def_brackets_propagation_with_gamma() {
    let run = |hi_def: bool| {
        let mut config = test_config(Resolution::X2, 8, 1);
        config.hi_def = hi_def;
        let mut map = LightMap::new(9, 9);
        map.set_color(4, 4, Rgb::WHITE);
        engine(config).spread_light(&mut map).expect("propagation");
        map
    };

    let plain = run(false);
    let hi = run(true);

    // White is a fixed point of the gamma conversion.
    assert_eq!(hi.color(4, 4), Rgb::WHITE);
    // Everything else is the linear result pushed back through the gamma.
    let expected = plain.color(4, 3).to_gamma();
    assert!(
        (hi.color(4, 3).r - expected.r).abs() < 1e-4,
        "hi-def axis value {} should equal gamma of linear {}",
        hi.color(4, 3).r,
        expected.r
    );
}

#[test]
fn test_resolution_switch_preserves_area() {
    let mut light_engine = engine(test_config(Resolution::X1, 8, 1));
    let area = Some(Area::new(1, 1, 4, 4));
    light_engine.set_area(area);

    let mut config = light_engine.config().clone();
    config.resolution = Resolution::X4;
    light_engine
        .update_config(config)
        .expect("resolution switch");

    assert_eq!(light_engine.area(), area);
    assert_eq!(light_engine.config().resolution, Resolution::X4);
}
