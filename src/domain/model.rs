use serde::{Deserialize, Serialize};
use std::fmt;

/// 從裝置收到的一行原始文字（保留行尾的空白與控制字元）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine(String);

impl RawLine {
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RawLine {
    fn from(line: &str) -> Self {
        Self::new(line)
    }
}

impl fmt::Display for RawLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSample {
    /// 秒 (wall clock)
    pub timestamp: f64,
    pub value_mg: f64,
}

impl WeightSample {
    pub fn new(timestamp: f64, value_mg: f64) -> Self {
        Self {
            timestamp,
            value_mg,
        }
    }
}

/// 解碼結果：重量或非重量訊息（例如時間同步）
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Weight(WeightSample),
    NonWeight(RawLine),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowRecord {
    pub sample: WeightSample,
    pub instant_flow: f64,
    pub windowed_flow: f64,
    pub running_avg_flow: f64,
}

impl fmt::Display for FlowRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.10}\t{:.10}\t{:.10}\t{:.10}",
            self.sample.value_mg, self.instant_flow, self.windowed_flow, self.running_avg_flow
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vendor {
    Denver,
    Metler,
    Dummy,
}

impl Vendor {
    /// 對應設定檔中的 `model` 名稱，不認得的名稱回傳 None
    pub fn from_model_name(name: &str) -> Option<Self> {
        match name.trim() {
            "Denver" => Some(Vendor::Denver),
            "Metler" => Some(Vendor::Metler),
            "Dummy" => Some(Vendor::Dummy),
            _ => None,
        }
    }

    pub fn needs_transport(&self) -> bool {
        !matches!(self, Vendor::Dummy)
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Vendor::Denver => "Denver",
            Vendor::Metler => "Metler",
            Vendor::Dummy => "Dummy",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterConfig {
    pub vendor: Vendor,
    pub echo_off: bool,
}

impl AdapterConfig {
    pub fn for_vendor(vendor: Vendor) -> Self {
        Self {
            vendor,
            echo_off: matches!(vendor, Vendor::Denver),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingMode {
    /// 流量計算（水力傳導度量測）
    Hydro,
    /// 單純記錄質量
    Log,
}

impl fmt::Display for RecordingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingMode::Hydro => f.write_str("hydro"),
            RecordingMode::Log => f.write_str("log"),
        }
    }
}

/// 鍵盤指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCommand {
    LogCurrent,
    Quit,
    Start,
    Stop,
    Unknown(String),
}

impl KeyCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim_end_matches(['\r', '\n']) {
            "" => KeyCommand::LogCurrent,
            "q" => KeyCommand::Quit,
            "c" => KeyCommand::Start,
            "s" => KeyCommand::Stop,
            other => KeyCommand::Unknown(other.to_string()),
        }
    }
}
