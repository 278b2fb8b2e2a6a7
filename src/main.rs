mod color;
mod engine;
mod interactive;
mod lightmap;
mod render;

#[cfg(test)]
mod tests;

// Re-export public API
pub use color::{Rgb, to_byte};
pub use engine::decay::{DISTANCE_TICKS, DecayCurve, DecayModel, DecayRates, TileClass};
pub use engine::{Area, EngineConfig, EngineError, LightEngine, Resolution};
pub use interactive::{InteractiveViewer, ViewerConfig};
pub use lightmap::LightMap;
pub use render::{NormalizationMode, normalize, save_ppm};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--interactive" {
        run_interactive();
    } else if args.len() > 1 && args[1] == "--benchmark" {
        run_benchmark();
    } else {
        println!("gridlight");
        println!("Run with --interactive for minifb viewer");
        println!("Run with --benchmark to test performance");
    }
}

fn run_benchmark() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::time::Instant;

    println!("=== Light Propagation Benchmark ===\n");

    let (width, height) = (200, 150);
    let iterations = 10;
    let mut rng = StdRng::seed_from_u64(0x51EE7);

    // A representative cave-ish scene: scattered walls, a few dozen torches.
    let mut base = LightMap::new(width, height);
    for i in 0..width * height {
        if rng.gen_bool(0.15) {
            base.mask_mut()[i] = TileClass::Solid;
        } else if rng.gen_bool(0.02) {
            base.mask_mut()[i] = TileClass::Water;
        }
    }
    for _ in 0..60 {
        let x = rng.gen_range(0..width);
        let y = rng.gen_range(0..height);
        let color = Rgb::new(
            rng.gen_range(0.3..1.0),
            rng.gen_range(0.3..1.0),
            rng.gen_range(0.3..1.0),
        );
        base.set_color(x, y, color);
    }

    println!("Grid size: {}x{}, {} iterations each", width, height, iterations);
    println!("--------------------------------------");

    for resolution in [Resolution::X1, Resolution::X2, Resolution::X4] {
        for workers in [1usize, 2, 8] {
            let config = EngineConfig {
                resolution,
                workers,
                max_light_range: 48,
                ..EngineConfig::default()
            };
            let mut engine = match LightEngine::new(config) {
                Ok(engine) => engine,
                Err(e) => {
                    eprintln!("failed to build engine: {e}");
                    return;
                }
            };

            // Warm up once so table construction stays out of the timing.
            let mut map = base.clone();
            let _ = engine.spread_light(&mut map);

            let start = Instant::now();
            for _ in 0..iterations {
                let mut map = base.clone();
                let _ = engine.spread_light(&mut map);
            }
            let avg_ms = start.elapsed().as_secs_f64() * 1000.0 / iterations as f64;
            println!(
                "  {:?} workers={}: {:>8.3} ms/frame ({:.1} FPS)",
                resolution,
                workers,
                avg_ms,
                1000.0 / avg_ms
            );
        }
        println!();
    }

    println!("=== Bounce Light Cost (2x, 8 workers) ===");
    for bounce in [false, true] {
        let config = EngineConfig {
            resolution: Resolution::X2,
            workers: 8,
            max_light_range: 48,
            bounce_light: bounce,
            ..EngineConfig::default()
        };
        let mut engine = match LightEngine::new(config) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("failed to build engine: {e}");
                return;
            }
        };
        let mut map = base.clone();
        let _ = engine.spread_light(&mut map);

        let start = Instant::now();
        for _ in 0..iterations {
            let mut map = base.clone();
            let _ = engine.spread_light(&mut map);
        }
        let avg_ms = start.elapsed().as_secs_f64() * 1000.0 / iterations as f64;
        println!(
            "  bounce {}: {:>8.3} ms/frame",
            if bounce { "ON " } else { "OFF" },
            avg_ms
        );
    }
}

fn run_interactive() {
    let config = ViewerConfig::default();

    match InteractiveViewer::new(config) {
        Ok(mut viewer) => {
            if let Err(e) = viewer.run() {
                eprintln!("Error: {}", e);
            }
        }
        Err(e) => {
            eprintln!("Failed to create viewer: {}", e);
        }
    }
}
