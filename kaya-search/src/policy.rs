//! Per-candidate policy records driving the expansion rule.

use rand::Rng;
use rand_distr::{Distribution, Gumbel};

/// A legal candidate move with its prior and the number of times the
/// owning node's expansion rule has picked it. The pick count is distinct
/// from the child node's own visit count; it exists so racing workers
/// spread over siblings instead of dog-piling the best prior.
#[derive(Debug, Clone)]
pub struct PolicyEntry {
    pub x: i32,
    pub y: i32,
    pub prior: f32,
    /// Times the parent's expansion rule selected this candidate.
    pub visits: u32,
}

impl PolicyEntry {
    pub fn new(x: i32, y: i32, prior: f32) -> Self {
        Self {
            x,
            y,
            prior,
            visits: 0,
        }
    }

    /// Expansion priority with the prior sharpened by `temperature_power`
    /// and optionally perturbed in log space by Gumbel noise.
    pub fn priority(&self, temperature_power: f32, noise: f32, rng: &mut impl Rng) -> f32 {
        let mut p = self.prior.max(0.0).powf(temperature_power);
        if noise > 0.0 {
            if let Ok(gumbel) = Gumbel::new(0.0f32, noise) {
                p *= gumbel.sample(rng).exp();
            }
        }
        p / (self.visits + 1) as f32
    }
}

/// The sharpening exponent: flat near certain wins, `1/temperature` near
/// certain losses, so a losing side concentrates on its best hopes.
pub fn temperature_power(win_chance: f32, temperature: f32) -> f32 {
    let win_chance = win_chance.clamp(0.0, 1.0);
    win_chance + (1.0 / temperature) * (1.0 - win_chance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn priority_decays_with_pick_count() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let fresh = PolicyEntry::new(0, 0, 0.5);
        let mut picked = PolicyEntry::new(0, 0, 0.5);
        picked.visits = 3;

        assert!(fresh.priority(1.0, 0.0, &mut rng) > picked.priority(1.0, 0.0, &mut rng));
    }

    #[test]
    fn losing_positions_sharpen_the_prior() {
        // Near-certain loss with temperature 0.5 raises the exponent.
        let losing = temperature_power(0.0, 0.5);
        let winning = temperature_power(1.0, 0.5);
        assert!((losing - 2.0).abs() < 1e-6);
        assert!((winning - 1.0).abs() < 1e-6);

        // A sharper exponent shrinks small priors more than large ones.
        let strong = PolicyEntry::new(0, 0, 0.6);
        let weak = PolicyEntry::new(0, 0, 0.1);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let ratio_flat = strong.priority(1.0, 0.0, &mut rng) / weak.priority(1.0, 0.0, &mut rng);
        let ratio_sharp = strong.priority(2.0, 0.0, &mut rng) / weak.priority(2.0, 0.0, &mut rng);
        assert!(ratio_sharp > ratio_flat);
    }

    #[test]
    fn noise_perturbs_priorities() {
        let entry = PolicyEntry::new(0, 0, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let a = entry.priority(1.0, 1.0, &mut rng);
        let b = entry.priority(1.0, 1.0, &mut rng);
        assert_ne!(a, b);
    }
}
