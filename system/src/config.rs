use std::time::Duration;

use crate::error::Error;
use crate::membership::{retransmit_limit, Packet, MAX_DATAGRAM};

/// Protocol parameters shared by every membership component.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Length of one protocol period (`t_p`).
    pub protocol_period: Duration,
    /// How long a direct ping waits for its ack before escalating (`t_to`).
    pub ping_timeout: Duration,
    /// Number of members asked to probe indirectly (`k`).
    pub indirect_probes: usize,
    /// Dissemination thoroughness (`λ`).
    pub lambda: f64,
    /// Maximum number of updates piggybacked on a single packet.
    pub max_gossip: usize,
    /// How many removed member ids are remembered.
    pub removed_capacity: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            protocol_period: Duration::from_millis(1000),
            ping_timeout: Duration::from_millis(300),
            indirect_probes: 3,
            lambda: 3.0,
            max_gossip: 8,
            removed_capacity: 1024,
        }
    }
}

impl Config {
    /// Builds a configuration from the failure detector requirements.
    ///
    /// * `detection_time` - target failure detection time (`t_f`)
    /// * `non_faulty` - expected fraction of non-faulty members (`q`)
    /// * `round_trip` - high percentile of the round trip time, used as `t_to`
    /// * `delivery_rate` - packet delivery probability (`r`)
    /// * `false_positive` - tolerable false positive probability (`p_fp`)
    pub fn derive(
        detection_time: Duration,
        non_faulty: f64,
        round_trip: Duration,
        delivery_rate: f64,
        false_positive: f64,
    ) -> Result<Config, Error> {
        let config = Config {
            protocol_period: protocol_period_bound(detection_time, non_faulty),
            ping_timeout: round_trip,
            indirect_probes: indirect_probes(non_faulty, delivery_rate, false_positive)?,
            ..Config::default()
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let minimum_period = self.ping_timeout.checked_mul(3).ok_or_else(|| {
            Error::InvalidConfiguration(format!(
                "ping timeout {:?} is too large",
                self.ping_timeout,
            ))
        })?;

        if self.protocol_period < minimum_period {
            return Err(Error::InvalidConfiguration(format!(
                "protocol period {:?} must be at least three ping timeouts ({:?})",
                self.protocol_period, self.ping_timeout,
            )));
        }

        if self.ping_timeout.is_zero() {
            return Err(Error::InvalidConfiguration(String::from(
                "ping timeout must be greater than zero",
            )));
        }

        if self.indirect_probes == 0 {
            return Err(Error::InvalidConfiguration(String::from(
                "at least one indirect probe is required",
            )));
        }

        if !(self.lambda > 1.0) {
            return Err(Error::InvalidConfiguration(format!(
                "lambda must be greater than one, got {}",
                self.lambda,
            )));
        }

        if self.max_gossip == 0 || self.removed_capacity == 0 {
            return Err(Error::InvalidConfiguration(String::from(
                "max gossip and removed capacity must be greater than zero",
            )));
        }

        let largest_packet = match self.max_gossip {
            max_gossip if max_gossip > MAX_DATAGRAM => usize::MAX,
            max_gossip => Packet::max_encoded_len(max_gossip)?,
        };

        if largest_packet > MAX_DATAGRAM {
            return Err(Error::InvalidConfiguration(format!(
                "max gossip {} allows packets larger than {} bytes",
                self.max_gossip, MAX_DATAGRAM,
            )));
        }

        Ok(())
    }

    /// Time a member may stay suspected before it is declared failed, which is
    /// the same horizon used to retire gossip messages.
    pub fn suspicion_timeout(&self, members: usize) -> Duration {
        self.protocol_period
            .saturating_mul(retransmit_limit(self.lambda, members))
    }
}

/// Upper bound for the protocol period: `t_f · (1 − e^−q)`.
pub fn protocol_period_bound(detection_time: Duration, non_faulty: f64) -> Duration {
    detection_time.mul_f64(1.0 - (-non_faulty).exp())
}

/// Real valued number of indirect probes needed to keep the false positive
/// probability under `false_positive`.
pub fn indirect_probe_estimate(non_faulty: f64, delivery_rate: f64, false_positive: f64) -> f64 {
    let q = non_faulty;
    let r = delivery_rate;

    let numerator = (false_positive / q * (1.0 - (-q).exp()) / (1.0 - r.powi(2))).ln();
    let denominator = (1.0 - q * r.powi(4)).ln();

    numerator / denominator
}

pub fn indirect_probes(
    non_faulty: f64,
    delivery_rate: f64,
    false_positive: f64,
) -> Result<usize, Error> {
    let inputs = [non_faulty, delivery_rate, false_positive];

    if inputs.iter().any(|value| !(*value > 0.0 && *value < 1.0)) {
        return Err(Error::InvalidConfiguration(format!(
            "probabilities must be within (0, 1) -> q {} r {} p_fp {}",
            non_faulty, delivery_rate, false_positive,
        )));
    }

    let estimate = indirect_probe_estimate(non_faulty, delivery_rate, false_positive);

    if !estimate.is_finite() {
        return Err(Error::InvalidConfiguration(String::from(
            "indirect probe estimate is not finite",
        )));
    }

    Ok((estimate.ceil() as usize).max(1))
}
