use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::scenario::types::{ScenarioDef, Suite};
use crate::{Result, RucheckError};

/// 从 JSON 文本解析套件
pub fn parse_json(content: &str) -> Result<Suite> {
    serde_json::from_str(content).map_err(|e| RucheckError::ParseError(format!("套件 JSON: {}", e)))
}

/// 从 TOML 文本解析套件
pub fn parse_toml(content: &str) -> Result<Suite> {
    toml::from_str(content).map_err(|e| RucheckError::ParseError(format!("套件 TOML: {}", e)))
}

/// 按扩展名加载单个套件文件
pub fn load_suite<P: AsRef<Path>>(path: P) -> Result<Suite> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    let mut suite = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&content),
        Some("toml") => parse_toml(&content),
        _ => Err(RucheckError::ParseError(format!(
            "不支持的套件文件类型 (需要 .json 或 .toml): {}",
            path.display()
        ))),
    }
    .map_err(|e| match e {
        RucheckError::ParseError(msg) => {
            RucheckError::ParseError(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;

    if suite.name.is_none() {
        suite.name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string);
    }
    debug!(
        suite = suite.name.as_deref().unwrap_or_default(),
        scenarios = suite.scenarios.len(),
        "loaded suite"
    );
    Ok(suite)
}

/// 合并多个套件，返回按声明顺序排列的场景
///
/// 场景名在所有套件中必须唯一。
pub fn collect_scenarios(suites: Vec<Suite>) -> Result<Vec<ScenarioDef>> {
    let mut seen = HashSet::new();
    let mut scenarios = Vec::new();

    for suite in suites {
        for mut scenario in suite.scenarios {
            if !seen.insert(scenario.name.clone()) {
                return Err(RucheckError::DuplicateScenario(scenario.name));
            }
            scenario.suite = suite.name.clone();
            scenarios.push(scenario);
        }
    }

    Ok(scenarios)
}

/// 加载所有套件文件
pub fn load_suites<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ScenarioDef>> {
    let suites = paths.iter().map(load_suite).collect::<Result<Vec<_>>>()?;
    collect_scenarios(suites)
}
