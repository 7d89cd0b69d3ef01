//! Lossy LAN model for exercising the sync paths

use std::time::Duration;

use rand::Rng;

/// Link conditions applied to simulated peer traffic
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkSimulator {
    /// Probability that a packet or command is lost (0.0 to 1.0)
    pub loss_rate: f64,
    /// Upper bound of the random extra delay
    pub jitter: Duration,
    /// Delay every packet pays
    pub base_delay: Duration,
}

impl NetworkSimulator {
    /// No loss, no delay
    #[must_use]
    pub fn perfect() -> Self {
        Self {
            loss_rate: 0.0,
            jitter: Duration::ZERO,
            base_delay: Duration::ZERO,
        }
    }

    /// Switched wired LAN
    #[must_use]
    pub fn wired_lan() -> Self {
        Self {
            loss_rate: 0.0001,
            jitter: Duration::from_millis(1),
            base_delay: Duration::ZERO,
        }
    }

    /// LAN shared with heavy traffic
    #[must_use]
    pub fn busy_lan() -> Self {
        Self {
            loss_rate: 0.01,
            jitter: Duration::from_millis(10),
            base_delay: Duration::from_millis(2),
        }
    }

    /// Link that loses everything
    #[must_use]
    pub fn partitioned() -> Self {
        Self {
            loss_rate: 1.0,
            ..Self::perfect()
        }
    }

    /// Override the loss probability
    #[must_use]
    pub fn with_loss(mut self, loss_rate: f64) -> Self {
        self.loss_rate = loss_rate.clamp(0.0, 1.0);
        self
    }

    /// Roll for the loss of one packet
    #[must_use]
    pub fn drops_packet(&self) -> bool {
        match self.loss_rate {
            rate if rate <= 0.0 => false,
            rate if rate >= 1.0 => true,
            rate => rand::thread_rng().gen_bool(rate),
        }
    }

    /// Delay for one packet: the base plus up to `jitter`
    #[must_use]
    pub fn sample_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.base_delay;
        }
        let jitter_us = u64::try_from(self.jitter.as_micros()).unwrap_or(u64::MAX);
        self.base_delay + Duration::from_micros(rand::thread_rng().gen_range(0..=jitter_us))
    }
}

impl Default for NetworkSimulator {
    fn default() -> Self {
        Self::perfect()
    }
}
