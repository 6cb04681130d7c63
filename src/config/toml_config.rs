use crate::domain::model::{RecordingMode, Vendor};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{BalanceError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub main: MainConfig,
    #[serde(default)]
    pub hydro: HydroConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MainConfig {
    pub mode: RecordingMode,
    pub model: String,
    pub comport: String,
    pub baud: u32,
    /// 每次請求重量的間隔（秒）
    pub update_interval: f64,
    pub tag: String,
    pub log_dir: String,
}

impl Default for MainConfig {
    fn default() -> Self {
        Self {
            mode: RecordingMode::Hydro,
            model: "Metler".to_string(),
            comport: "/dev/ttyS0".to_string(),
            baud: 9600,
            update_interval: 5.0,
            tag: "balance".to_string(),
            log_dir: ".".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HydroConfig {
    /// 流量計算使用的輪詢次數
    pub flow_interval: usize,
    /// 移動平均的窗口流量數
    pub average_n: usize,
}

impl Default for HydroConfig {
    fn default() -> Self {
        Self {
            flow_interval: 6,
            average_n: 4,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BalanceError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時使用預設值
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::info!(
                "Config file {} not found, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BalanceError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 寫回檔案
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| BalanceError::ConfigValidationError {
                field: "toml_serialization".to_string(),
                message: e.to_string(),
            })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 替換環境變數 (例如 ${BALANCE_PORT})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BalanceError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 解析 `model`；不認得的型號改用 Dummy
    pub fn resolved_vendor(&self) -> Vendor {
        Vendor::from_model_name(&self.main.model).unwrap_or(Vendor::Dummy)
    }

    /// 載入並套用覆蓋設定後呼叫一次，不認得的型號在此提示
    pub fn resolve_vendor(&self) -> Vendor {
        let vendor = self.resolved_vendor();
        if Vendor::from_model_name(&self.main.model).is_none() {
            tracing::error!(
                "Unknown balance model: {}. Using dummy output for testing",
                self.main.model
            );
        }
        vendor
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("main.comport", &self.main.comport)?;
        validation::validate_path("main.comport", &self.main.comport)?;
        validation::validate_path("main.log_dir", &self.main.log_dir)?;
        validation::validate_positive_number("main.baud", self.main.baud as usize, 1)?;
        validation::validate_positive_seconds("main.update_interval", self.main.update_interval)?;
        validation::validate_positive_number("hydro.flow_interval", self.hydro.flow_interval, 2)?;
        validation::validate_positive_number("hydro.average_n", self.hydro.average_n, 1)?;
        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn mode(&self) -> RecordingMode {
        self.main.mode
    }

    fn vendor(&self) -> Vendor {
        self.resolved_vendor()
    }

    fn port(&self) -> &str {
        &self.main.comport
    }

    fn baud(&self) -> u32 {
        self.main.baud
    }

    fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.main.update_interval).unwrap_or(Duration::ZERO)
    }

    fn flow_window(&self) -> usize {
        self.hydro.flow_interval
    }

    fn average_window(&self) -> usize {
        self.hydro.average_n
    }

    fn tag(&self) -> &str {
        &self.main.tag
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[main]
mode = "log"
model = "Denver"
comport = "/dev/ttyUSB0"
baud = 4800
update_interval = 2.5
tag = "stem-3"

[hydro]
flow_interval = 10
average_n = 3
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.mode(), RecordingMode::Log);
        assert_eq!(config.vendor(), Vendor::Denver);
        assert_eq!(config.port(), "/dev/ttyUSB0");
        assert_eq!(config.baud(), 4800);
        assert_eq!(config.poll_interval(), Duration::from_millis(2500));
        assert_eq!(config.flow_window(), 10);
        assert_eq!(config.average_window(), 3);
        assert_eq!(config.tag(), "stem-3");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = TomlConfig::from_toml_str("[main]\nmodel = \"Denver\"\n").unwrap();

        assert_eq!(config.mode(), RecordingMode::Hydro);
        assert_eq!(config.port(), "/dev/ttyS0");
        assert_eq!(config.baud(), 9600);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.flow_window(), 6);
        assert_eq!(config.average_window(), 4);
    }

    #[test]
    fn test_unknown_model_falls_back_to_dummy() {
        let config = TomlConfig::from_toml_str("[main]\nmodel = \"Sartorius\"\n").unwrap();
        assert_eq!(config.resolve_vendor(), Vendor::Dummy);
        assert_eq!(config.vendor(), Vendor::Dummy);
        // 原始字串保留，寫回設定檔時不被改成 Dummy
        assert_eq!(config.main.model, "Sartorius");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SBALANCE_TEST_PORT", "/dev/ttyACM7");

        let config =
            TomlConfig::from_toml_str("[main]\ncomport = \"${SBALANCE_TEST_PORT}\"\n").unwrap();
        assert_eq!(config.port(), "/dev/ttyACM7");

        std::env::remove_var("SBALANCE_TEST_PORT");
    }

    #[test]
    fn test_config_validation() {
        let zero_interval = TomlConfig::from_toml_str("[main]\nupdate_interval = 0\n").unwrap();
        assert!(zero_interval.validate().is_err());

        let tiny_window = TomlConfig::from_toml_str("[hydro]\nflow_interval = 1\n").unwrap();
        assert!(tiny_window.validate().is_err());

        let empty_port = TomlConfig::from_toml_str("[main]\ncomport = \"  \"\n").unwrap();
        assert!(empty_port.validate().is_err());

        assert!(TomlConfig::from_toml_str("[main]\nmode = \"fast\"\n").is_err());
    }

    #[test]
    fn test_config_file_round_trip() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[main]\nmodel = \"Metler\"\nupdate_interval = 1\n")
            .unwrap();

        let mut config = TomlConfig::from_file(temp_file.path()).unwrap();
        config.hydro.average_n = 8;
        config.save(temp_file.path()).unwrap();

        let reloaded = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(reloaded.average_window(), 8);
        assert_eq!(reloaded.poll_interval(), Duration::from_secs(1));
    }
}
