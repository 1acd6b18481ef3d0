use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use clash::collision::{ArbiterConfig, EndpointConfig};
use clash::net::LinkConditions;
use clash::prediction::{MovementConfig, ReconcileConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub tick_rate: u32,
    pub clients: usize,
    /// Distance between actor centres that counts as a contact.
    pub contact_radius: f32,
    pub seed: u64,
    pub link: LinkConditions,
    pub movement: MovementConfig,
    pub reconcile: ReconcileConfig,
    pub arbiter: ArbiterConfig,
    pub endpoint: EndpointConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: clash::DEFAULT_TICK_RATE,
            clients: 4,
            contact_radius: 0.8,
            seed: 0,
            link: LinkConditions::with_latency(40),
            movement: MovementConfig::default(),
            reconcile: ReconcileConfig::default(),
            arbiter: ArbiterConfig::default(),
            endpoint: EndpointConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Rejects values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tick_rate == 0 {
            bail!("tick rate must be positive");
        }
        if !(0.0..=100.0).contains(&self.link.loss_percent) {
            bail!("loss percentage must be within 0-100");
        }
        if self.reconcile.history_capacity == 0 {
            bail!("reconcile history capacity must be positive");
        }
        if !(0.0..=1.0).contains(&self.reconcile.blend_factor) {
            bail!("reconcile blend factor must be within 0-1");
        }
        Ok(())
    }

    pub fn tick_delta(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ServerConfig = serde_json::from_str(
            r#"{
                "clients": 8,
                "link": { "loss_percent": 5.0, "min_latency_ms": 20, "max_latency_ms": 60 },
                "reconcile": { "blend_factor": 0.5 },
                "arbiter": { "retry_delay": 150 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.clients, 8);
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.link.max_latency_ms, 60);
        assert_eq!(config.reconcile.blend_factor, 0.5);
        assert_eq!(config.reconcile.history_capacity, 1024);
        assert_eq!(config.arbiter.retry_delay, Duration::from_millis(150));
        assert_eq!(config.endpoint.cooldown, Duration::from_secs(3));
        assert_eq!(config.movement.move_speed, 5.0);
    }

    #[test]
    fn zero_history_capacity_is_rejected() {
        let config: ServerConfig =
            serde_json::from_str(r#"{ "reconcile": { "history_capacity": 0 } }"#).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("history capacity"));

        assert!(ServerConfig::default().validate().is_ok());
    }
}
