//! Property tests for the step function over random populations and configs.

use flock_core::{
    step, Agent, AgentId, Bounds, Population, SimulationConfig, SpeedPolicy, StepOptions,
};
use nalgebra::Vector2;
use proptest::prelude::*;

fn arb_agents(max_len: usize) -> impl Strategy<Value = Vec<Agent>> {
    prop::collection::vec(
        (-120.0..120.0f64, -120.0..120.0f64, -3.0..3.0f64, -3.0..3.0f64),
        1..max_len,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (x, y, vx, vy))| Agent::at(i as u32 * 3 + 1, x, y, vx, vy))
            .collect()
    })
}

/// Mostly clustered, with some agents scattered far enough apart that the
/// grid would need more cells than it allows.
fn arb_sparse_agents(max_len: usize) -> impl Strategy<Value = Vec<Agent>> {
    let coordinate = prop_oneof![3 => -120.0..120.0f64, 1 => -1.0e6..1.0e6f64];
    prop::collection::vec(
        (coordinate.clone(), coordinate, -3.0..3.0f64, -3.0..3.0f64),
        1..max_len,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (x, y, vx, vy))| Agent::at(i as u32, x, y, vx, vy))
            .collect()
    })
}

fn arb_config() -> impl Strategy<Value = SimulationConfig> {
    (
        (1.0..60.0f64, 0.0..1.0f64),
        (0.0..0.01f64, 0.0..0.2f64, 0.0..0.2f64),
        prop::bool::ANY,
        (0.5..5.0f64, 0.05..1.0f64),
        (0.0..20.0f64, 0.0..1.0f64),
    )
        .prop_map(|((visual, protected_frac), (c, s, a), min_max, (max, min_frac), (margin, turn))| {
            let speed = if min_max {
                SpeedPolicy::MinMax { min: max * min_frac, max }
            } else {
                SpeedPolicy::MaxOnly { max }
            };
            SimulationConfig::default()
                .with_ranges(visual, visual * protected_frac)
                .with_weights(c, s, a)
                .with_speed(speed)
                .with_bounds(Bounds::square(100.0))
                .with_margin(margin, turn)
        })
}

fn all_options() -> [StepOptions; 4] {
    [
        StepOptions::default(),
        StepOptions::default().parallel(true),
        StepOptions::default().spatial_grid(true),
        StepOptions::default().parallel(true).spatial_grid(true),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn step_preserves_size_and_ids(agents in arb_agents(40), config in arb_config()) {
        let before = Population::new(agents).unwrap();
        let after = step(&before, &config, StepOptions::default()).unwrap();

        prop_assert_eq!(after.len(), before.len());
        prop_assert_eq!(after.ids(), before.ids());
    }

    #[test]
    fn step_respects_speed_bound(agents in arb_agents(40), config in arb_config()) {
        let before = Population::new(agents).unwrap();
        let after = step(&before, &config, StepOptions::default()).unwrap();
        let max = config.speed.max();

        for agent in after.iter() {
            prop_assert!(agent.speed() <= max * (1.0 + 1e-9), "speed {} > {}", agent.speed(), max);
        }
    }

    #[test]
    fn step_contains_positions(agents in arb_agents(40), config in arb_config()) {
        let before = Population::new(agents).unwrap();
        let after = step(&before, &config, StepOptions::default()).unwrap();

        for agent in after.iter() {
            prop_assert!(config.bounds.contains(&agent.position), "{:?} escaped", agent.position);
        }
    }

    #[test]
    fn step_is_deterministic(agents in arb_agents(30), config in arb_config()) {
        let before = Population::new(agents).unwrap();
        let first = step(&before, &config, StepOptions::default()).unwrap();
        let second = step(&before, &config, StepOptions::default()).unwrap();

        prop_assert_eq!(first, second);
    }

    #[test]
    fn execution_strategies_agree(agents in arb_agents(60), config in arb_config()) {
        let before = Population::new(agents).unwrap();
        let reference = step(&before, &config, StepOptions::default()).unwrap();

        for options in all_options() {
            prop_assert_eq!(&step(&before, &config, options).unwrap(), &reference);
        }
    }

    #[test]
    fn execution_strategies_agree_when_sparse(agents in arb_sparse_agents(40), config in arb_config()) {
        let config = config.with_bounds(Bounds::square(2.0e6));
        let before = Population::new(agents).unwrap();
        let reference = step(&before, &config, StepOptions::default()).unwrap();

        for options in all_options() {
            prop_assert_eq!(&step(&before, &config, options).unwrap(), &reference);
        }
    }

    #[test]
    fn isolated_agent_only_moves(
        x in -40.0..40.0f64,
        y in -40.0..40.0f64,
        vx in -1.0..1.0f64,
        vy in -1.0..1.0f64,
    ) {
        // Far outside visual range of its only companion, away from walls, speed within policy
        prop_assume!((vx * vx + vy * vy).sqrt() >= 0.3);
        let config = SimulationConfig::default();
        let before = Population::new(vec![
            Agent::at(0, x, y, vx, vy),
            Agent::at(1, 95.0, 95.0, 0.0, 1.0),
        ])
        .unwrap();
        prop_assume!(before.agents()[0].squared_distance_to(&before.agents()[1]) >= config.visual_range_squared());

        let after = step(&before, &config, StepOptions::default()).unwrap();
        let agent = &after.agents()[0];

        prop_assert_eq!(agent.velocity, Vector2::new(vx, vy));
        prop_assert_eq!(agent.position, Vector2::new(x + vx, y + vy));
    }

    #[test]
    fn close_pair_repels_symmetrically(
        x in -50.0..50.0f64,
        y in -50.0..50.0f64,
        dx in -2.0..2.0f64,
        dy in -2.0..2.0f64,
    ) {
        let config = SimulationConfig::default()
            .with_weights(0.0, 0.1, 0.0)
            .with_speed(SpeedPolicy::MaxOnly { max: 10.0 });
        let before = Population::new(vec![
            Agent::at(0, x, y, 0.0, 0.0),
            Agent::at(1, x + dx, y + dy, 0.0, 0.0),
        ])
        .unwrap();

        let after = step(&before, &config, StepOptions::default()).unwrap();
        let (a, b) = (&after.agents()[0], &after.agents()[1]);

        prop_assert_eq!(a.velocity, -b.velocity);
    }
}

#[test]
fn identical_positions_give_zero_repulsion() {
    let config = SimulationConfig::default().with_speed(SpeedPolicy::MaxOnly { max: 2.0 });
    let before = Population::new(vec![
        Agent::at(0, 10.0, 10.0, 0.0, 0.0),
        Agent::at(1, 10.0, 10.0, 0.0, 0.0),
    ])
    .unwrap();

    let after = step(&before, &config, StepOptions::default()).unwrap();

    // Equal and opposite, and both zero since the offset is zero
    assert_eq!(after.agents()[0].velocity, Vector2::zeros());
    assert_eq!(after.agents()[1].velocity, Vector2::zeros());
    assert_eq!(after.get(AgentId(1)).unwrap().position, Vector2::new(10.0, 10.0));
}
