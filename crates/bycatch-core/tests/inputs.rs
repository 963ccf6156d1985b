//! Input files to a running simulation

use std::fs;

use bycatch_core::{io, HistoricalEffort, SimConfig, Simulation};
use tempfile::tempdir;

fn landscape_file(width: u32, height: u32) -> String {
    let mut text = format!("{width};{height};1;1;1;{};1;{};1.0;1.0;1.0;1.0\n", width * height, width * height);
    for _ in 0..width * height {
        text.push_str("-20;5;1;1;1;1.0;1;1;1;1\n");
    }
    text
}

#[test]
fn test_files_drive_gear_deployment() {
    let dir = tempdir().unwrap();
    let land_path = dir.path().join("landscape.csv");
    let hauls_path = dir.path().join("hauls.csv");
    let effort_path = dir.path().join("effort.csv");
    fs::write(&land_path, landscape_file(6, 6)).unwrap();
    fs::write(
        &hauls_path,
        "zone;year;day;type;n;pinger\n0;0;0;0;2;0\n0;1;0;0;2;0\n0;1;400;0;2;0\n",
    )
    .unwrap();
    fs::write(
        &effort_path,
        "zone;season;type;soak;length\n0;0;0;12;0.4\n0;1;0;12;0.4\n0;2;0;12;0.4\n0;3;0;12;0.4\n",
    )
    .unwrap();

    let desc = io::read_landscape(&land_path).unwrap();
    assert_eq!(desc.cells.len(), 36);
    let mut effort = HistoricalEffort::new(2);
    let hauls = io::read_hauls(&hauls_path, desc.fishery_zones, &mut effort).unwrap();
    let samples = io::read_effort(&effort_path, desc.fishery_zones, &mut effort).unwrap();
    assert_eq!((hauls.accepted, hauls.skipped), (2, 1));
    assert_eq!(samples.accepted, 4);

    let mut config = SimConfig::default();
    config.population.initial = vec![10];
    config.simulation.steps = 48;
    config.simulation.seed = Some(4);

    let mut sim = Simulation::new(config, desc).unwrap().with_effort(Box::new(effort));
    sim.tick();
    let stats = sim.stats();
    assert_eq!(stats.gear_deployed + stats.gear_discarded, 2);
    for (_, gear) in sim.gear().iter() {
        assert_eq!(gear.max_soak_days, 0.5);
        assert_eq!(gear.zone, 0);
    }

    sim.run().unwrap();
    // half-day soak: everything set on the first day is hauled by its end
    assert_eq!(sim.stats().gear_retired, sim.stats().gear_deployed);
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bycatch.toml");
    fs::write(
        &path,
        "[simulation]\nsteps = 96\nseed = 12\n\n[population]\ninitial = [7]\n",
    )
    .unwrap();

    let config = SimConfig::load(&path).unwrap();
    assert_eq!(config.simulation.steps, 96);
    assert_eq!(config.simulation.seed, Some(12));

    let sim = Simulation::new(config, io::parse_landscape(&landscape_file(4, 4), "land").unwrap()).unwrap();
    assert_eq!(sim.seed(), 12);
    assert_eq!(sim.population().len(), 7);
}
