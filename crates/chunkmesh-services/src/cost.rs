//! Transfer cost model — expected time to push a chunk across one link.
//!
//!   base = latency_ms / 1000 + (bytes * 8) / (bandwidth_kbps * 1000)
//!
//! With probability `packet_loss` the chunk is penalised by a uniform
//! 1..=3 retries, multiplying the base by `1 + retries`. The penalty is
//! arithmetic only; nothing is re-sent and the estimate is never recomputed.

use chunkmesh_core::{Connection, Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The three link parameters the cost model reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkProfile {
    pub bandwidth_kbps: f64,
    pub latency_ms: f64,
    pub packet_loss: f64,
}

impl LinkProfile {
    pub fn new(bandwidth_kbps: f64, latency_ms: f64, packet_loss: f64) -> Result<Self> {
        let link = Self {
            bandwidth_kbps,
            latency_ms,
            packet_loss,
        };
        link.validate()?;
        Ok(link)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.bandwidth_kbps.is_finite() && self.bandwidth_kbps > 0.0) {
            return Err(Error::invalid(format!(
                "bandwidth must be > 0 kbps, got {}",
                self.bandwidth_kbps
            )));
        }
        if !(self.latency_ms.is_finite() && self.latency_ms >= 0.0) {
            return Err(Error::invalid(format!(
                "latency must be >= 0 ms, got {}",
                self.latency_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.packet_loss) {
            return Err(Error::invalid(format!(
                "packet loss must be in [0, 1], got {}",
                self.packet_loss
            )));
        }
        Ok(())
    }

    /// The slice of this link one of `workers` equal sharers gets.
    pub fn share(&self, workers: usize) -> Self {
        Self {
            bandwidth_kbps: self.bandwidth_kbps / workers.max(1) as f64,
            ..*self
        }
    }

    pub fn estimate<R: Rng + ?Sized>(&self, byte_count: u64, rng: &mut R) -> Result<f64> {
        estimate_duration(
            byte_count,
            self.bandwidth_kbps,
            self.latency_ms,
            self.packet_loss,
            rng,
        )
    }
}

impl From<&Connection> for LinkProfile {
    fn from(c: &Connection) -> Self {
        Self {
            bandwidth_kbps: c.bandwidth_kbps,
            latency_ms: c.latency_ms,
            packet_loss: c.packet_loss,
        }
    }
}

/// Loss-free duration in seconds. Callers validate `bandwidth_kbps > 0`.
pub fn base_duration(byte_count: u64, bandwidth_kbps: f64, latency_ms: f64) -> f64 {
    latency_ms / 1000.0 + (byte_count as f64 * 8.0) / (bandwidth_kbps * 1000.0)
}

/// Expected seconds to move `byte_count` bytes over one link.
///
/// `rng` is only consulted when `packet_loss > 0`.
pub fn estimate_duration<R: Rng + ?Sized>(
    byte_count: u64,
    bandwidth_kbps: f64,
    latency_ms: f64,
    packet_loss: f64,
    rng: &mut R,
) -> Result<f64> {
    LinkProfile {
        bandwidth_kbps,
        latency_ms,
        packet_loss,
    }
    .validate()?;

    let base = base_duration(byte_count, bandwidth_kbps, latency_ms);
    if packet_loss > 0.0 && rng.gen::<f64>() < packet_loss {
        let retries: u32 = rng.gen_range(1..=3);
        return Ok(base * f64::from(1 + retries));
    }
    Ok(base)
}
