//! Train, checkpoint, and restore a small classifier.
//!
//! Architecture: 2 → 16 (ReLU, dropout 0.2) → 16 (ReLU, dropout 0.2) → 4 (log-softmax)
//! Data:         four noisy quadrant clusters, synthesised in place
//! Optimizer:    SGD, lr = 0.1, batch size 16
//!
//! Run with:
//!   RUST_LOG=info cargo run --example train_and_checkpoint

use fcnet::{checkpoint, evaluate, train_loop, Network, NetworkSpec, Sgd, TrainConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `n` points per quadrant, labelled by quadrant.
fn quadrants(n: usize, rng: &mut StdRng) -> (Vec<Vec<f64>>, Vec<usize>) {
    let centers = [(1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)];
    let mut inputs = Vec::with_capacity(4 * n);
    let mut labels = Vec::with_capacity(4 * n);
    for (class, &(cx, cy)) in centers.iter().enumerate() {
        for _ in 0..n {
            inputs.push(vec![cx + rng.gen_range(-0.6..0.6), cy + rng.gen_range(-0.6..0.6)]);
            labels.push(class);
        }
    }
    (inputs, labels)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut rng = StdRng::seed_from_u64(2024);
    let (train_x, train_y) = quadrants(200, &mut rng);
    let (val_x, val_y) = quadrants(50, &mut rng);

    let spec = NetworkSpec::new(2, 4, vec![16, 16])?;
    let mut network = Network::build(&spec)?.with_dropout(0.2)?;

    let config = TrainConfig::new(20, 16).with_print_every(5);
    train_loop(
        &mut network,
        &train_x,
        &train_y,
        Some(&val_x),
        Some(&val_y),
        &Sgd::new(0.1),
        &config,
    )?;

    let path = std::env::temp_dir().join("fcnet-quadrants.json");
    checkpoint::save(&path, &network)?;
    println!("Checkpoint written to {}", path.display());

    let (loss, accuracy) = evaluate(&mut network, &val_x, &val_y)?;
    let mut restored = checkpoint::load(&path)?;
    let (r_loss, r_accuracy) = evaluate(&mut restored, &val_x, &val_y)?;

    println!("{:>10}  {:>10}  {:>10}", "", "val loss", "val acc");
    println!("{:>10}  {:>10.6}  {:>9.2}%", "trained", loss, accuracy * 100.0);
    println!("{:>10}  {:>10.6}  {:>9.2}%", "restored", r_loss, r_accuracy * 100.0);
    Ok(())
}
