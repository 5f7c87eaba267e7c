use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tubenet::Simulation;
use tubenet::bake::Brightness;
use tubenet::clock::RunClock;
use tubenet::config::Params;
use tubenet::grid::{GRID_H, GRID_W};
use tubenet::render;

const INITIAL_CITIES: usize = 6;
const LOG_EVERY: usize = 100;
/// Background argument that selects the built-in demo map.
const SAMPLE_BACKGROUND: &str = "sample";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let seed: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(42);
    let steps: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(2000);
    let out_dir: PathBuf = args
        .get(3)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("artifacts"));
    let params = match args.get(4).filter(|s| !s.is_empty() && *s != "-") {
        Some(path) => Params::from_json_file(Path::new(path))
            .with_context(|| format!("loading params from {path}"))?,
        None => Params::default(),
    };
    params.validate()?;

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut sim = Simulation::new(GRID_W, GRID_H, seed);
    if let Some(source) = args.get(5) {
        let bg = if source == SAMPLE_BACKGROUND {
            Brightness::sample(GRID_W, GRID_H, seed)?
        } else {
            Brightness::open(Path::new(source), GRID_W, GRID_H)
                .with_context(|| format!("loading background {source}"))?
        };
        sim.set_background(bg);
    }
    sim.scatter_cities(INITIAL_CITIES);
    sim.reset(params.agents);

    info!(
        w = GRID_W,
        h = GRID_H,
        seed,
        steps,
        agents = params.agents,
        cities = sim.cities().len(),
        "running"
    );

    let mut clock = RunClock::new(Instant::now());
    let mut totals: Vec<(&'static str, f64)> = Vec::new();
    for step in 1..=steps {
        let timings = sim.tick(&params);
        for t in timings {
            match totals.iter_mut().find(|(name, _)| *name == t.name) {
                Some((_, ms)) => *ms += t.ms,
                None => totals.push((t.name, t.ms)),
            }
        }

        let m = sim.metrics();
        let elapsed = clock.observe(Instant::now(), m.all_connected);
        if step % LOG_EVERY == 0 || step == steps {
            info!(
                step,
                active = m.active,
                components = m.components,
                connected = m.connected_count,
                all_connected = m.all_connected,
                elapsed_s = elapsed.as_secs_f64(),
                "tick"
            );
        }
    }

    // Print timings
    eprintln!("\nTimings (total over {steps} ticks):");
    for (name, ms) in &totals {
        eprintln!("  {:20} {:8.1} ms", name, ms);
    }
    match clock.best() {
        Some(best) => info!(best_s = best.as_secs_f64(), "all cities connected"),
        None => info!("cities never fully connected"),
    }

    // Save snapshots
    let save = |name: &str, rgba: &[u8]| -> Result<()> {
        let path = out_dir.join(name);
        image::save_buffer(&path, rgba, GRID_W as u32, GRID_H as u32, image::ColorType::Rgba8)
            .with_context(|| format!("saving {}", path.display()))?;
        info!(path = %path.display(), "saved");
        Ok(())
    };

    save("fields.png", &sim.render(params.tube_threshold))?;
    save("trail.png", &render::render_trail(&sim.fields().trail.current))?;

    let metrics_path = out_dir.join("metrics.json");
    std::fs::write(&metrics_path, serde_json::to_string_pretty(sim.metrics())?)
        .with_context(|| format!("writing {}", metrics_path.display()))?;

    Ok(())
}
