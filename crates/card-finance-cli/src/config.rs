use card_finance_core::EngineConfig;
use log::debug;
use std::fs;
use std::path::Path;

/// Load the engine configuration. No path means built-in defaults.
/// `.yaml`/`.yml` files are parsed as YAML, anything else as JSON.
pub fn load(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let contents = fs::read_to_string(path).map_err(|e| format!("Failed to read config '{}': {}", path, e))?;
    let config = parse(path, &contents).map_err(|e| format!("Failed to parse config '{}': {}", path, e))?;
    debug!("loaded engine config from {path}");
    Ok(config)
}

fn parse(path: &str, contents: &str) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let is_yaml = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if is_yaml {
        Ok(serde_yaml::from_str(contents)?)
    } else {
        Ok(serde_json::from_str(contents)?)
    }
}
