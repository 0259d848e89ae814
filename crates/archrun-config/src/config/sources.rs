use std::collections::BTreeMap;

use archrun_switches::redact;

use super::{Config, ConfigSource};

impl Config {
    /// Effective configuration as `key -> (value, source)`.
    ///
    /// Defaults are listed too. Switch values are shown serialized, with any
    /// password masked.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let settings = self.runner_settings();
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: String| {
            let source = self.source_of(key).as_str().to_string();
            config.insert(key.to_string(), (value, source));
        };

        add("program", self.program().to_string());
        add("read_buffer_bytes", settings.read_buffer_bytes.to_string());
        add("terminate", settings.terminate.as_str().to_string());
        add("kill_grace_ms", settings.kill_grace.as_millis().to_string());

        let switches = match self.switches.to_args() {
            Ok(tokens) => redact(&tokens).join(" "),
            Err(e) => format!("<invalid: {e}>"),
        };
        add("switches", switches);

        config
    }
}
