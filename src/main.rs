use std::{env, error::Error, fs::File, process};

use log::info;
use rand::{rngs::StdRng, SeedableRng};

use torfit::{
    config::Config,
    fitter::{AnnealOptions, Fitter},
    series::read_energy_series,
};

fn main() {
    env_logger::init();
    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: torfit <config.toml>");
        process::exit(1);
    };
    if let Err(e) = run(&path) {
        eprintln!("torfit: {e}");
        process::exit(1);
    }
}

fn run(path: &str) -> Result<(), Box<dyn Error>> {
    let config = Config::load(path)?;
    let qme = read_energy_series(&config.qme)?;
    let mme = read_energy_series(&config.mme)?;
    let mut fitter = Fitter::new(
        qme,
        mme,
        config.temperature,
        config.criterion,
        config.offset_method,
        config.energy_cutoff,
        None,
    )?;
    for dihedral in &config.dihedrals {
        fitter.add_series_file(&dihedral.file, dihedral.term_spec()?)?;
    }
    info!(
        "fitting {} constants over {} dihedral types",
        fitter.dimension(),
        fitter.types().count()
    );
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut progress = File::create("rmsd.log")?;
    let opts = AnnealOptions {
        schedule: (&config.anneal).into(),
        ..Default::default()
    };
    let result = fitter.anneal(&opts, &mut rng, &mut progress)?;
    info!("best objective {:.4}", result.value);
    let report = fitter.report(result.k.as_slice(), true)?;
    print!("{report}");
    serde_json::to_writer_pretty(File::create("fit.json")?, &report)?;
    Ok(())
}
