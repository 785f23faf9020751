use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::Config;

/// Ordered list of config file locations searched from lowest to highest
/// priority.  Later files override earlier ones.
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. System-wide default
    paths.push(PathBuf::from("/etc/dfagent/config.toml"));

    // 2. XDG / home
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config/dfagent/config.toml"));
    }
    if let Some(cfg) = dirs::config_dir() {
        paths.push(cfg.join("dfagent/config.toml"));
    }

    // 3. Workspace-local
    paths.push(PathBuf::from(".dfagent/config.toml"));
    paths.push(PathBuf::from("dfagent.toml"));

    paths
}

/// Load configuration by merging all discovered TOML files, then the
/// explicit path (e.g. the `--config` CLI flag), then `DFAGENT_*`
/// environment overrides, lowest to highest priority.
pub fn load(extra: Option<&Path>) -> anyhow::Result<Config> {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    for path in config_search_paths() {
        if path.is_file() {
            debug!(path = %path.display(), "loading config layer");
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let layer: toml::Value = toml::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            merge_toml(&mut merged, layer);
        }
    }

    if let Some(p) = extra {
        debug!(path = %p.display(), "loading explicit config");
        let text = std::fs::read_to_string(p)
            .with_context(|| format!("reading {}", p.display()))?;
        let layer: toml::Value = toml::from_str(&text)
            .with_context(|| format!("parsing {}", p.display()))?;
        merge_toml(&mut merged, layer);
    }

    merge_toml(&mut merged, env_layer(std::env::vars()));

    let config: Config = merged.try_into().context("invalid configuration")?;
    Ok(config)
}

/// Highest-priority layer: `DFAGENT_<SECTION>__<FIELD>` environment
/// variables, e.g. `DFAGENT_AGENT__MAX_ITERATIONS=5` sets
/// `[agent] max_iterations`.
fn env_layer(vars: impl Iterator<Item = (String, String)>) -> toml::Value {
    let mut root = toml::map::Map::new();
    for (key, value) in vars {
        let Some(rest) = key.strip_prefix("DFAGENT_") else { continue };
        let Some((section, field)) = rest.split_once("__") else { continue };
        if section.is_empty() || field.is_empty() {
            continue;
        }
        let table = root
            .entry(section.to_lowercase())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        if let toml::Value::Table(t) = table {
            t.insert(field.to_lowercase(), env_scalar(&value));
        }
    }
    toml::Value::Table(root)
}

/// Environment values carry no type; coerce the obvious scalars.
fn env_scalar(value: &str) -> toml::Value {
    if let Ok(v) = value.parse::<i64>() {
        return toml::Value::Integer(v);
    }
    if let Ok(v) = value.parse::<f64>() {
        return toml::Value::Float(v);
    }
    if let Ok(v) = value.parse::<bool>() {
        return toml::Value::Boolean(v);
    }
    toml::Value::String(value.to_string())
}

/// Deep-merge `src` into `dst`; src wins on scalar conflicts.
fn merge_toml(dst: &mut toml::Value, src: toml::Value) {
    match (dst, src) {
        (toml::Value::Table(d), toml::Value::Table(s)) => {
            for (k, v) in s {
                let entry = d.entry(k).or_insert(toml::Value::Table(toml::map::Map::new()));
                merge_toml(entry, v);
            }
        }
        (dst, src) => *dst = src,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
