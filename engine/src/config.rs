//! Engine tuning knobs (spec §4.7, §6.3 `engine` config section).

/// Runtime configuration for [`crate::Engine`]. The `config` crate's loader
/// produces one of these from the `engine:` section of the YAML file.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Hard cap on model turns per `CreateResponse` call (spec §4.7.2).
    pub max_turns: u32,
    /// Bounds concurrent tool executions within a single turn.
    pub max_parallel_tools: usize,
    /// Used when a request omits `model` entirely (client SDKs that always
    /// send one never hit this; kept for the `gateway` bin's config-driven
    /// default).
    pub default_model: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            max_parallel_tools: 4,
            default_model: None,
        }
    }
}
