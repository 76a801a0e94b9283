//! Synthetic trajectory generation for offline calibration and testbenches.
//!
//! Produces a 3D spiral ground truth, a drifted path (cumulative process
//! noise, what the un-modelled motors actually do) and a noisy measurement
//! stream (what the camera reports). The steady-state gain is derived from
//! the two noise variances: K = Q / (Q + R).

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

#[derive(Clone, Debug)]
pub struct SimConfig {
    pub steps: usize,
    /// Time step in seconds.
    pub dt: f64,
    /// Std dev of the per-step drift increments (process noise).
    pub drift_noise_std: f64,
    /// Std dev of the measurement noise.
    pub meas_noise_std: f64,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            steps: 200,
            dt: 0.1,
            drift_noise_std: 0.2,
            meas_noise_std: 0.5,
            seed: 7,
        }
    }
}

pub struct GeneratedTrajectories {
    pub truth: Vec<[f64; 3]>,
    pub drifty: Vec<[f64; 3]>,
    pub noisy: Vec<[f64; 3]>,
    /// Derived steady-state blending gain in [0, 1].
    pub gain: f64,
}

/// Standard normal via Box-Muller; keeps the generator free of extra
/// distribution crates while staying reproducible under a seeded RNG.
fn sample_normal(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

pub fn derive_gain(drift_noise_std: f64, meas_noise_std: f64) -> f64 {
    let q = drift_noise_std * drift_noise_std;
    let r = meas_noise_std * meas_noise_std;
    q / (q + r)
}

pub fn generate(config: &SimConfig) -> GeneratedTrajectories {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let n = config.steps;
    let span = n as f64 * config.dt;

    let mut truth = Vec::with_capacity(n);
    let mut drifty = Vec::with_capacity(n);
    let mut noisy = Vec::with_capacity(n);
    let mut drift = [0f64; 3];

    for i in 0..n {
        // Endpoint-inclusive time axis, matching the reference generator.
        let t = if n > 1 {
            i as f64 * span / (n as f64 - 1.0)
        } else {
            0.0
        };
        let point = [5.0 * t.cos(), 5.0 * t.sin(), 0.5 * t];
        truth.push(point);

        for axis in 0..3 {
            drift[axis] += sample_normal(&mut rng) * config.drift_noise_std;
        }
        drifty.push([
            point[0] + drift[0],
            point[1] + drift[1],
            point[2] + drift[2],
        ]);

        noisy.push([
            point[0] + sample_normal(&mut rng) * config.meas_noise_std,
            point[1] + sample_normal(&mut rng) * config.meas_noise_std,
            point[2] + sample_normal(&mut rng) * config.meas_noise_std,
        ]);
    }

    GeneratedTrajectories {
        truth,
        drifty,
        noisy,
        gain: derive_gain(config.drift_noise_std, config.meas_noise_std),
    }
}
