use crate::scenario::FailurePolicy;
use crate::variable::resolver::VariableResolver;
use crate::variable::types::Environment;
use crate::{Result, RucheckError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `[run]` 段：运行参数，均可被命令行覆盖
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RunSettings {
    pub base_url: Option<String>,
    pub fixtures: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub failure_policy: Option<FailurePolicy>,
    pub scenario_timeout: Option<String>,
    pub request_timeout: Option<String>,
}

/// 完整的配置文件
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RucheckConfig {
    #[serde(default)]
    pub run: RunSettings,

    /// 所有环境配置
    #[serde(default)]
    pub environments: HashMap<String, Environment>,

    /// 配置文件所在路径（相对路径以其目录为基准）
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl RucheckConfig {
    /// 获取指定环境的变量
    pub fn get_environment(&self, env_name: &str) -> Option<&Environment> {
        self.environments.get(env_name)
    }

    /// fixture 目录，相对路径按配置文件所在目录解析
    pub fn fixtures_dir(&self) -> Option<PathBuf> {
        let dir = self.run.fixtures.as_ref()?;
        match self.source.as_ref().and_then(|p| p.parent()) {
            Some(base) if dir.is_relative() => Some(base.join(dir)),
            _ => Some(dir.clone()),
        }
    }

    pub fn scenario_timeout(&self) -> Result<Option<Duration>> {
        self.run
            .scenario_timeout
            .as_deref()
            .map(parse_duration)
            .transpose()
    }

    pub fn request_timeout(&self) -> Result<Option<Duration>> {
        self.run
            .request_timeout
            .as_deref()
            .map(parse_duration)
            .transpose()
    }
}

/// 配置文件加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 配置文件名
    const CONFIG_FILE: &'static str = "rucheck.toml";

    /// 从指定路径加载配置文件
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<RucheckConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RucheckError::Config(format!("无法读取配置文件 {}: {}", path.display(), e))
        })?;

        let mut config: RucheckConfig = toml::from_str(&content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// 查找并加载配置文件
    /// 查找顺序：
    /// 1. 当前目录
    /// 2. 父目录递归查找
    /// 3. 用户配置目录 ~/.config/rucheck/
    pub fn find_and_load() -> Result<Option<RucheckConfig>> {
        match Self::find_config_file() {
            Some(path) => Self::load_from_path(path).map(Some),
            None => Ok(None),
        }
    }

    fn find_config_file() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let config_path = current.join(Self::CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            // 尝试父目录
            if !current.pop() {
                break;
            }
        }

        let home = dirs::home_dir()?;
        let config_path = home.join(".config").join("rucheck").join(Self::CONFIG_FILE);
        config_path.exists().then_some(config_path)
    }

    /// 构建种子变量
    /// env_name: 环境名称（如 "dev", "prod"）
    /// cli_vars: CLI 传入的变量覆盖（--var key=value）
    pub fn build_seed(
        config: &RucheckConfig,
        env_name: Option<&str>,
        cli_vars: &[(String, String)],
    ) -> Result<HashMap<String, Value>> {
        let mut seed = HashMap::new();

        // 1. 从配置文件加载环境变量
        if let Some(name) = env_name {
            let env = config
                .get_environment(name)
                .ok_or_else(|| RucheckError::Config(format!("未定义的环境: {}", name)))?;
            for (key, value) in &env.variables {
                // 解析系统环境变量 ${VAR}
                let value = match value {
                    Value::String(s) => Value::String(VariableResolver::resolve_env_vars(s)),
                    other => other.clone(),
                };
                seed.insert(key.clone(), value);
            }
        }

        // 2. 应用 CLI 覆盖（优先级最高）
        for (key, value) in cli_vars {
            seed.insert(key.clone(), Value::String(value.clone()));
        }

        Ok(seed)
    }

    /// 解析 CLI 变量参数 "key=value"
    pub fn parse_cli_var(s: &str) -> Option<(String, String)> {
        s.split_once('=')
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .filter(|(k, _)| !k.is_empty())
    }
}

/// 解析时长，支持 `ms`、`s`、`m` 后缀
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let invalid = || RucheckError::Config(format!("无效的时长: {}", s));

    if let Some(ms) = s.strip_suffix("ms") {
        let millis: u64 = ms.trim().parse().map_err(|_| invalid())?;
        Ok(Duration::from_millis(millis))
    } else if let Some(sec) = s.strip_suffix('s') {
        let secs: u64 = sec.trim().parse().map_err(|_| invalid())?;
        Ok(Duration::from_secs(secs))
    } else if let Some(min) = s.strip_suffix('m') {
        let mins: u64 = min.trim().parse().map_err(|_| invalid())?;
        Ok(Duration::from_secs(mins * 60))
    } else {
        Err(RucheckError::Config(format!(
            "时长必须以 'ms'、's' 或 'm' 结尾: {}",
            s
        )))
    }
}
