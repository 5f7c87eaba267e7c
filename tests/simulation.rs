use tubenet::agents::{Agent, Agents};
use tubenet::config::Params;
use tubenet::deposit::CAP;
use tubenet::field::FieldKind;
use tubenet::{Brush, Simulation};

fn small_params(agents: usize) -> Params {
    Params {
        agents,
        ..Params::default()
    }
}

fn seeded(w: usize, h: usize, seed: u64, agents: usize) -> Simulation {
    let mut sim = Simulation::new(w, h, seed);
    sim.scatter_cities(4);
    sim.reset(agents);
    sim
}

#[test]
fn same_seed_gives_identical_runs() {
    let params = small_params(300);
    let mut a = seeded(96, 64, 7, params.agents);
    let mut b = seeded(96, 64, 7, params.agents);
    for _ in 0..25 {
        a.tick(&params);
        b.tick(&params);
    }
    assert_eq!(a.agents().as_slice(), b.agents().as_slice());
    for kind in FieldKind::ALL {
        assert_eq!(a.fields().get(kind), b.fields().get(kind));
    }
    assert_eq!(a.metrics(), b.metrics());
}

#[test]
fn reset_replays_the_run() {
    let params = small_params(200);
    let mut sim = seeded(64, 48, 11, params.agents);
    for _ in 0..10 {
        sim.tick(&params);
    }
    let first = sim.fields().trail.current.clone();

    sim.reset(params.agents);
    assert_eq!(sim.step_index(), 0);
    assert!(sim.fields().trail.current.data.iter().all(|&v| v == 0.0));
    for _ in 0..10 {
        sim.tick(&params);
    }
    assert_eq!(sim.fields().trail.current, first);
}

#[test]
fn ticks_keep_fields_capped_and_agents_inside() {
    let params = small_params(800);
    let mut sim = seeded(80, 60, 3, params.agents);
    sim.paint(Brush::Food, 40.0, 30.0, &params);
    sim.paint(Brush::Repel, 20.0, 20.0, &params);
    for _ in 0..40 {
        sim.tick(&params);
    }
    for kind in FieldKind::ALL {
        let g = sim.fields().get(kind);
        assert!(g.data.iter().all(|&v| (0.0..=CAP).contains(&v)), "{kind:?} out of range");
    }
    let (w, h) = (sim.w as f32, sim.h as f32);
    for a in sim.agents().as_slice() {
        assert!(a.x >= 1.0 && a.x <= w - 2.0, "x {}", a.x);
        assert!(a.y >= 1.0 && a.y <= h - 2.0, "y {}", a.y);
    }
    assert_eq!(sim.step_index(), 40);
}

#[test]
fn tick_resizes_population_to_params() {
    let mut sim = seeded(64, 48, 5, 100);
    assert_eq!(sim.agents().len(), 100);
    sim.tick(&small_params(250));
    assert_eq!(sim.agents().len(), 250);
    sim.tick(&small_params(0));
    assert!(sim.agents().is_empty());
}

#[test]
fn painting_deposits_the_scaled_amount() {
    let params = Params::default();
    let mut sim = Simulation::new(64, 64, 1);
    sim.paint(Brush::Food, 30.0, 30.0, &params);
    let food = &sim.fields().food.current;
    assert!((food.get(30, 30) - params.paint_amount()).abs() < 1e-6);
    assert!(food.get(30 + params.brush_radius as usize, 30) > 0.0);
    assert_eq!(food.get(30 + params.brush_radius as usize + 1, 30), 0.0);
    assert!(sim.fields().repel.current.data.iter().all(|&v| v == 0.0));
}

#[test]
fn mask_lifecycle() {
    let params = small_params(0);
    let mut sim = Simulation::new(80, 80, 9);

    // Too few points: discarded, no mask recorded
    sim.start_mask(params.mask_strength);
    assert!(sim.add_mask_point(10.0, 10.0));
    assert!(sim.add_mask_point(30.0, 10.0));
    assert_eq!(sim.finish_mask(), None);
    assert!(sim.masks().masks().is_empty());
    assert!(!sim.add_mask_point(1.0, 1.0));

    sim.start_mask(params.mask_strength);
    for p in [[20.0, 20.0], [60.0, 20.0], [20.0, 60.0]] {
        sim.add_mask_point(p[0], p[1]);
    }
    let id = sim.finish_mask().expect("triangle is kept");
    assert_eq!(sim.masks().masks().len(), 1);
    assert!(sim.masks().masks()[0].cell_count() > 0);

    sim.tick(&params);
    assert!(sim.fields().repel.current.get(25, 25) > 0.0);
    assert_eq!(sim.fields().repel.current.get(70, 70), 0.0);

    assert_eq!(sim.toggle_mask_enabled(id), Some(false));
    assert!(sim.set_mask_enabled(id, true));
    assert!(sim.delete_mask(id));
    assert!(!sim.delete_mask(id));
    assert!(sim.masks().masks().is_empty());
}

#[test]
fn metrics_follow_a_painted_tube() {
    let mut sim = Simulation::new(20, 20, 0);
    sim.add_city(3.0, 3.0);
    sim.add_city(15.0, 15.0);
    for x in 3..=15 {
        sim.deposit(FieldKind::Trail, x as f32, 3.0, 0.0, 1.0);
    }
    for y in 4..=15 {
        sim.deposit(FieldKind::Trail, 15.0, y as f32, 0.0, 1.0);
    }

    let m = sim.metrics_at(0.25);
    assert_eq!(m.active, 25);
    assert_eq!(m.components, 1);
    assert_eq!(m.connected_count, 2);
    assert!(m.all_connected);

    // Break the path in the middle
    sim.deposit(FieldKind::Trail, 9.0, 3.0, 0.0, -1.0);
    let m = sim.metrics_at(0.25);
    assert_eq!(m.components, 2);
    assert!(!m.all_connected);
}

#[test]
fn agent_walking_off_the_left_edge_reappears_on_the_right() {
    let params = small_params(1);
    let mut sim = Simulation::new(20, 20, 4);
    sim.set_agents(Agents::from_vec(vec![Agent {
        x: 1.0,
        y: 10.0,
        heading: std::f32::consts::PI,
    }]));
    sim.tick(&params);
    let a = sim.agents().as_slice()[0];
    assert_eq!(a.x, 18.0);
    assert!((a.y - 10.0).abs() < 1.0);
}
