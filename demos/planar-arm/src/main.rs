//! Planar Arm Example
//!
//! Plans motions for a two-link planar arm around a joint-space wall,
//! first without and then with a cached approximation of a "keep the
//! shoulder low" path constraint, and finally benchmarks every
//! configuration of the arm.
//!
//! Usage: `planar-arm [config.toml]` (defaults to the bundled `planning.toml`).

use std::sync::Arc;

use planforge::prelude::*;
use planforge::PlannerConfiguration;
use planforge_test::{ObstacleScene, PlanarArm, RandomTreeEngine, StraightLineEngine};

const BUNDLED_CONFIG: &str = include_str!("../planning.toml");

fn main() {
    planforge::logging::init();

    let config = match std::env::args().nth(1) {
        Some(path) => PlanningConfig::load(&path).unwrap_or_else(|e| {
            eprintln!("Failed to load {path}: {e}; using the bundled configuration");
            bundled_config()
        }),
        None => bundled_config(),
    };

    let interface = PlanningInterface::new(
        Arc::new(PlanarArm::new()),
        Arc::new(RandomTreeEngine),
        config,
    );
    interface.register_engine("StraightLine", Arc::new(StraightLineEngine::new()));
    print_configurations(&interface);

    let scene: Arc<dyn PlanningScene> = Arc::new(ObstacleScene::wall_with_gap());
    let request = MotionPlanRequest::new("arm")
        .with_goal(joint_goal(1.0, -0.5))
        .with_timeout(2.0);

    println!("\n== Plain request ==");
    report(&interface.solve(&scene, &request));

    let shoulder_low = Constraints::named("shoulder low")
        .with_joint(JointConstraint::new("shoulder", 0.0, 1.5));
    match interface.add_constraint_approximation(&shoulder_low, "arm", None, scene.clone()) {
        Ok(approximation) => println!(
            "\nBuilt approximation: {} states, {} edges",
            approximation.state_count(),
            approximation.edge_count()
        ),
        Err(e) => eprintln!("\nApproximation build failed: {e}"),
    }

    println!("\n== Request with path constraints ==");
    let constrained = request.clone().with_path_constraints(shoulder_low);
    report(&interface.solve(&scene, &constrained));

    println!("\n== Benchmark ==");
    let bench = BenchmarkConfig::new("planar-arm").with_run_count(3);
    match interface.benchmark(&scene, &request, &bench) {
        Ok(result) => {
            for configuration in &result.configurations {
                println!(
                    "{:<20} success {:>5.1}%  avg time {:>8.2?}  avg length {}",
                    configuration.configuration,
                    configuration.success_rate() * 100.0,
                    configuration.average_solve_time().unwrap_or_default(),
                    configuration
                        .average_path_length()
                        .map_or_else(|| "-".to_string(), |l| format!("{l:.3}")),
                );
            }
        }
        Err(e) => eprintln!("Benchmark failed: {e}"),
    }
}

fn bundled_config() -> PlanningConfig {
    PlanningConfig::from_toml_str(BUNDLED_CONFIG).unwrap_or_else(|e| {
        eprintln!("Bundled configuration is invalid ({e}); using defaults");
        PlanningConfig::new().with_planner_config(PlannerConfiguration::new(
            "arm",
            "arm",
            "RandomTree",
        ))
    })
}

fn joint_goal(shoulder: f64, elbow: f64) -> Constraints {
    Constraints::named("goal")
        .with_joint(JointConstraint::new("shoulder", shoulder, 0.05))
        .with_joint(JointConstraint::new("elbow", elbow, 0.05))
}

fn print_configurations(interface: &PlanningInterface) {
    println!("Planner configurations:");
    for name in interface.planner_configurations().names() {
        println!("  {name}");
    }
}

fn report(response: &MotionPlanResponse) {
    match (&response.trajectory, response.error_code) {
        (Some(trajectory), ErrorCode::Success) => {
            println!(
                "Solved in {:.2?}: {} waypoints, joint-space length {:.3}",
                response.planning_time,
                trajectory.len(),
                trajectory.length()
            );
            for waypoint in &trajectory.waypoints {
                println!("  [{:>7.3}, {:>7.3}]", waypoint[0], waypoint[1]);
            }
        }
        (_, code) => println!(
            "Failed with {code}: {}",
            response.message.as_deref().unwrap_or("no details")
        ),
    }
    if let Some(diagnostics) = &response.diagnostics {
        println!(
            "  attempts {}, successful {}, approximation used: {}",
            diagnostics.attempts.len(),
            diagnostics.success_count(),
            diagnostics.approximation_used
        );
    }
}
