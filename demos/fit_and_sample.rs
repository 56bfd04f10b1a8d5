use gaussmix::{GaussianMixture, Refinement, Regression};
use rand::prelude::*;
use rand_distr::StandardNormal;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=gaussmix=debug shows the k-means and EM progress.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Noisy samples of y = 0.5 x on two separate x ranges.
    let mut rng = StdRng::seed_from_u64(17);
    let data: Vec<[f64; 2]> = (0..400)
        .map(|i| {
            let x = if i % 2 == 0 { rng.random_range(0.0..2.0) } else { rng.random_range(6.0..8.0) };
            let noise: f64 = rng.sample(StandardNormal);
            [x, 0.5 * x + 0.1 * noise]
        })
        .collect();

    let mut gmm = GaussianMixture::<2>::new().with_seed(17);
    gmm.set_num_states(2);
    gmm.init_kmeans(&data, 50)?;
    let report = gmm.em().with_max_iter(200).run(&data)?;
    println!(
        "EM: {} iterations, mean log-likelihood {:.4}, converged: {}",
        report.iterations, report.log_likelihood, report.converged
    );

    for s in 0..gmm.num_states() {
        println!("state {s}: prior {:.3}, mean {}", gmm.prior(s), gmm.mean(s));
    }

    let gmr = gmm.regression_model::<1>();
    for x in [1.0, 7.0] {
        println!("E[y | x = {x}] = {:.3}", gmr.predict(&[x])?[0]);
    }

    if let Some(sample) = gmm.draw() {
        println!("sample: {sample:?}");
    }

    let path = std::env::temp_dir().join("fit_and_sample.gmm");
    gmm.to_binary_file(&path)?;
    let mut reloaded = GaussianMixture::<2>::new();
    reloaded.from_binary_file(&path)?;
    println!("reloaded density at (1, 0.5): {:.4}", reloaded.pdf(&[1.0, 0.5]));
    Ok(())
}
