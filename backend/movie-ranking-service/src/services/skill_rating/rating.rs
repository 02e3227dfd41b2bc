// ============================================
// Pairwise Skill Rating
// ============================================
//
// Weng-Lin Bayesian approximation, Bradley-Terry full pairing.
//
// For item i against every other item q in one ordering:
//   c     = sqrt(σi² + σq² + 2β²)
//   p(iq) = 1 / (1 + exp((μq - μi) / c))
//   s     = 1 if i placed above q, else 0
//   Ω(i) += σi² / c · (s - p(iq))
//   Δ(i) += (σi / c) · σi² / c² · p(iq) · (1 - p(iq))
//
//   μi' = μi + Ω(i)
//   σi' = σi · sqrt(max(1 - Δ(i), κ))
//
// τ is added to every variance before an update so uncertainty never
// collapses to zero across many orderings.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MU: f64 = 0.0;
pub const DEFAULT_SIGMA: f64 = 25.0 / 3.0;
pub const DEFAULT_BETA: f64 = 25.0 / 6.0;
pub const DEFAULT_TAU: f64 = 25.0 / 300.0;
pub const DEFAULT_KAPPA: f64 = 0.0001;

/// Belief about one movie's strength
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillRating {
    pub mu: f64,
    pub sigma: f64,
}

impl Default for SkillRating {
    fn default() -> Self {
        Self {
            mu: DEFAULT_MU,
            sigma: DEFAULT_SIGMA,
        }
    }
}

impl SkillRating {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingModel {
    /// Prior every movie starts from
    pub prior: SkillRating,
    /// Performance variability
    pub beta: f64,
    /// Additive dynamics applied to sigma before each update
    pub tau: f64,
    /// Floor for the variance shrink factor
    pub kappa: f64,
}

impl Default for RatingModel {
    fn default() -> Self {
        Self {
            prior: SkillRating::default(),
            beta: DEFAULT_BETA,
            tau: DEFAULT_TAU,
            kappa: DEFAULT_KAPPA,
        }
    }
}

impl RatingModel {
    pub fn new(prior_sigma: f64, beta: f64, tau: f64) -> Self {
        Self {
            prior: SkillRating::new(DEFAULT_MU, prior_sigma),
            beta,
            tau,
            kappa: DEFAULT_KAPPA,
        }
    }

    /// Rate one finished ordering. `ordered[0]` beat `ordered[1]` beat
    /// `ordered[2]` and so on. Returns the posterior ratings in the same
    /// order. Every update reads the same input snapshot.
    pub fn rate(&self, ordered: &[SkillRating]) -> Vec<SkillRating> {
        if ordered.len() < 2 {
            return ordered.to_vec();
        }

        let two_beta_sq = 2.0 * self.beta * self.beta;
        let tau_sq = self.tau * self.tau;

        let dynamic: Vec<SkillRating> = ordered
            .iter()
            .map(|r| SkillRating::new(r.mu, (r.sigma * r.sigma + tau_sq).sqrt()))
            .collect();

        dynamic
            .iter()
            .enumerate()
            .map(|(i, rating_i)| {
                let sigma_i_sq = rating_i.sigma * rating_i.sigma;
                let mut omega = 0.0;
                let mut delta = 0.0;

                for (q, rating_q) in dynamic.iter().enumerate() {
                    if q == i {
                        continue;
                    }

                    let c = (sigma_i_sq + rating_q.sigma * rating_q.sigma + two_beta_sq).sqrt();
                    let p = 1.0 / (1.0 + ((rating_q.mu - rating_i.mu) / c).exp());
                    let score = if i < q { 1.0 } else { 0.0 };
                    let gamma = rating_i.sigma / c;

                    omega += sigma_i_sq / c * (score - p);
                    delta += gamma * sigma_i_sq / (c * c) * p * (1.0 - p);
                }

                SkillRating {
                    mu: rating_i.mu + omega,
                    sigma: rating_i.sigma * (1.0 - delta).max(self.kappa).sqrt(),
                }
            })
            .collect()
    }
}
