//! Subscription tier resolution for the content-recommendation branch.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// The user's (simulated) subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    Premium,
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Premium => write!(f, "premium"),
        }
    }
}

impl std::str::FromStr for SubscriptionTier {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "premium" => Ok(Self::Premium),
            _ => Err(format!("Unknown subscription tier: {}", s)),
        }
    }
}

/// Decides a session's tier. The session asks at most once and memoizes
/// the answer.
pub trait TierPolicy: Send + Sync {
    fn resolve(&self) -> SubscriptionTier;
}

/// Always the same tier.
#[derive(Debug, Clone, Copy)]
pub struct FixedTier(pub SubscriptionTier);

impl TierPolicy for FixedTier {
    fn resolve(&self) -> SubscriptionTier {
        self.0
    }
}

/// Coin flip with a configurable chance of `Free`.
#[derive(Debug, Clone, Copy)]
pub struct RandomTier {
    free_probability: f64,
}

impl RandomTier {
    pub fn new(free_probability: f64) -> Self {
        Self {
            free_probability: free_probability.clamp(0.0, 1.0),
        }
    }
}

impl Default for RandomTier {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl TierPolicy for RandomTier {
    fn resolve(&self) -> SubscriptionTier {
        if rand::thread_rng().gen_bool(self.free_probability) {
            SubscriptionTier::Free
        } else {
            SubscriptionTier::Premium
        }
    }
}
