use clap::{Parser, ValueEnum};
use granheat_core::{
    ContactAreaMode, GhostFold, GranularHeatExchange, HeatExchangeConfig, HostContext,
    MaterialProperties, OwnedNeighborList, PairStyle, ParticleStore,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AreaMode {
    Overlap,
    Projection,
    Constant,
}

/// Packed-bed heat exchange demo
#[derive(Parser, Debug)]
#[command(name = "granheat-demo")]
#[command(about = "Cubic packing of spheres heated from one face", long_about = None)]
struct Args {
    /// Particles per lattice edge
    #[arg(short, long, default_value_t = 6)]
    n: usize,

    /// Particle radius in meters
    #[arg(short, long, default_value_t = 0.005)]
    radius: f64,

    /// Lattice spacing as a multiple of the diameter (< 1 overlaps)
    #[arg(long, default_value_t = 0.98)]
    spacing: f64,

    /// Random displacement of each particle as a fraction of the radius
    #[arg(long, default_value_t = 0.02)]
    jitter: f64,

    /// Seed for the packing jitter
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Temperature of the heated bottom layer in K
    #[arg(long, default_value_t = 900.0)]
    hot_temp: f64,

    /// Initial temperature of every other particle in K
    #[arg(long, default_value_t = 300.0)]
    cold_temp: f64,

    /// Base thermal conductivity in W/(m K)
    #[arg(short = 'k', long, default_value_t = 1.4)]
    conductivity: f64,

    /// Particle density in kg/m^3
    #[arg(long, default_value_t = 2500.0)]
    density: f64,

    /// Specific heat capacity in J/(kg K)
    #[arg(long, default_value_t = 840.0)]
    heat_capacity: f64,

    /// Conduction contact-area model
    #[arg(long, value_enum, default_value_t = AreaMode::Overlap)]
    contact_area: AreaMode,

    /// Area for `--contact-area constant` in m^2
    #[arg(long, default_value_t = 1.0e-6)]
    constant_area: f64,

    /// Evaluate radiation on the rayon pool
    #[arg(short, long)]
    parallel: bool,

    /// Timestep in seconds
    #[arg(long, default_value_t = 0.01)]
    dt: f64,

    /// Number of timesteps
    #[arg(short, long, default_value_t = 2000)]
    steps: usize,

    /// Report every N steps
    #[arg(long, default_value_t = 250)]
    report_every: usize,
}

/// Half neighbor list of every pair closer than `cutoff`.
fn build_neighbors(store: &ParticleStore, cutoff: f64) -> OwnedNeighborList {
    let n = store.len();
    let rows: Vec<Vec<u32>> = (0..n)
        .map(|i| {
            ((i + 1)..n)
                .filter(|&j| {
                    let d2: f64 = (0..3)
                        .map(|c| (store.x[i][c] - store.x[j][c]).powi(2))
                        .sum();
                    d2 < cutoff * cutoff
                })
                .map(|j| j as u32)
                .collect()
        })
        .collect();
    OwnedNeighborList::from_rows(&rows)
}

fn layer_mean(store: &ParticleStore, n: usize, layer: usize) -> f64 {
    let per_layer = n * n;
    let start = layer * per_layer;
    store.temperature[start..start + per_layer].iter().sum::<f64>() / per_layer as f64
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if args.n == 0 || args.report_every == 0 {
        error!("--n and --report-every must be at least 1");
        std::process::exit(1);
    }

    println!("=== Granular Heat Exchange Demo ===\n");

    let contact_area = match args.contact_area {
        AreaMode::Overlap => ContactAreaMode::Overlap,
        AreaMode::Projection => ContactAreaMode::Projection,
        AreaMode::Constant => ContactAreaMode::Constant(args.constant_area),
    };
    let config = HeatExchangeConfig {
        contact_area,
        parallel_radiation: args.parallel,
        store_contact_data: true,
        ..Default::default()
    };

    let mut exchange = match GranularHeatExchange::new(config) {
        Ok(exchange) => exchange,
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let props = MaterialProperties::new().with("thermalConductivity", vec![args.conductivity]);
    let host = HostContext {
        newton_pair: false,
        pair_style: PairStyle::granular("gran/hertz/history", 1.5),
    };
    if let Err(e) = exchange.init(&props, &host.pair_style, 1) {
        error!("Material setup failed: {e}");
        std::process::exit(1);
    }

    // Layers are stacked along z; layer 0 is the heated face
    let pitch = 2.0 * args.radius * args.spacing;
    let max_shift = args.jitter.abs() * args.radius;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut jitter = || {
        if max_shift > 0.0 {
            rng.random_range(-max_shift..=max_shift)
        } else {
            0.0
        }
    };
    let mut store = ParticleStore::new();
    for iz in 0..args.n {
        for iy in 0..args.n {
            for ix in 0..args.n {
                let temperature = if iz == 0 { args.hot_temp } else { args.cold_temp };
                store.add_local(
                    [
                        ix as f64 * pitch + jitter(),
                        iy as f64 * pitch + jitter(),
                        iz as f64 * pitch + jitter(),
                    ],
                    args.radius,
                    1,
                    temperature,
                );
            }
        }
    }
    exchange.post_create(&mut store);

    let neighbors = build_neighbors(&store, 2.0 * args.radius);
    let mass = args.density * 4.0 / 3.0 * std::f64::consts::PI * args.radius.powi(3);
    let heat_capacity = mass * args.heat_capacity;

    println!(
        "Created {} particles ({}^3), pitch {:.4} m, {} contact candidates",
        store.len(),
        args.n,
        pitch,
        neighbors.view().neighbors.len()
    );
    println!(
        "Contact area: {:?}, parallel radiation: {}\n",
        contact_area, args.parallel
    );

    for step in 0..=args.steps {
        store.reset_flux();
        let summary = {
            let (state, mut buffers) = store.split();
            exchange.pre_force(&mut buffers);
            match exchange.post_force(
                &state,
                &mut buffers,
                &neighbors.view(),
                &host,
                &mut GhostFold::none(),
            ) {
                Ok(summary) => summary,
                Err(e) => {
                    error!("Heat exchange failed at step {step}: {e}");
                    std::process::exit(1);
                }
            }
        };

        if step % args.report_every == 0 {
            let mean_area = store.contact_data.as_ref().map_or(0.0, |c| {
                let counted: Vec<f64> = c
                    .area
                    .iter()
                    .zip(&c.count)
                    .filter(|(_, count)| **count > 0.5)
                    .map(|(&area, _)| area)
                    .collect();
                counted.iter().sum::<f64>() / counted.len().max(1) as f64
            });
            info!(
                step,
                time = step as f64 * args.dt,
                contacts = summary.contacts,
                radiative_pairs = summary.radiative_pairs,
                "Step report"
            );
            print!("t={:8.2}s  layers:", step as f64 * args.dt);
            for layer in 0..args.n {
                print!(" {:7.2}", layer_mean(&store, args.n, layer));
            }
            println!("  mean contact area {:.3e} m^2", mean_area);
        }

        // Explicit update; the heated face is held at its temperature
        let per_layer = args.n * args.n;
        for i in per_layer..store.len() {
            store.temperature[i] += args.dt * store.heat_flux[i] / heat_capacity;
        }
    }

    let total: f64 = store.temperature.iter().sum();
    println!(
        "\nFinal mean temperature: {:.2} K (top layer {:.2} K)",
        total / store.len() as f64,
        layer_mean(&store, args.n, args.n - 1)
    );
}
