use crate::domain::model::{AdapterConfig, RawLine, Reading, Vendor, WeightSample};
use thiserror::Error;

/// Denver 關閉回顯的指令
pub const DENVER_ECHO_OFF: &str = "SET SE OFF";
/// Denver 列印目前顯示值
pub const DENVER_PRINT: &str = "DO PR";
/// MT-SICS 立即送出重量
pub const METLER_SEND_IMMEDIATE: &str = "SI";

const GRAMS_UNIT: &str = "g";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("BAD LINE: {line:?} ({reason})")]
    Malformed { line: String, reason: String },
}

impl DecodeError {
    fn malformed(line: &RawLine, reason: impl Into<String>) -> Self {
        DecodeError::Malformed {
            line: line.as_str().to_string(),
            reason: reason.into(),
        }
    }
}

/// 一次重量請求的結果：送出指令，或（Dummy）直接得到數值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightRequest {
    Send(&'static str),
    Immediate(f64),
}

/// Denver Instruments serial protocol.
///
/// Weight lines look like `"1 + 0.0000\r\n"`, time lines like `"09:10:37\r\n"`.
/// Units are whatever the balance display is set to.
#[derive(Debug, Clone)]
pub struct DenverAdapter {
    echo_off: bool,
}

impl Default for DenverAdapter {
    fn default() -> Self {
        Self { echo_off: true }
    }
}

impl DenverAdapter {
    pub fn new(echo_off: bool) -> Self {
        Self { echo_off }
    }

    pub fn decode(&self, line: &RawLine, timestamp: f64) -> Result<Reading, DecodeError> {
        let text = line.as_str();
        let mut chars = text.char_indices().skip(2);
        let (offset, marker) = chars
            .next()
            .ok_or_else(|| DecodeError::malformed(line, "line too short"))?;

        let negative = match marker {
            ':' => return Ok(Reading::NonWeight(line.clone())),
            '+' => false,
            '-' => true,
            other => {
                return Err(DecodeError::malformed(
                    line,
                    format!("unexpected marker {:?} at position 2", other),
                ))
            }
        };

        let remainder = text[offset + marker.len_utf8()..].trim();
        let value: f64 = remainder
            .parse()
            .map_err(|e| DecodeError::malformed(line, format!("{}", e)))?;

        let value_mg = if negative { -value } else { value };
        Ok(Reading::Weight(WeightSample::new(timestamp, value_mg)))
    }
}

/// Metler Toledo serial protocol (MT-SICS), weight line `ID Status WeightValue Unit`.
#[derive(Debug, Clone, Default)]
pub struct MetlerAdapter;

impl MetlerAdapter {
    pub fn decode(&self, line: &RawLine, timestamp: f64) -> Result<Reading, DecodeError> {
        let fields: Vec<&str> = line.as_str().split_whitespace().collect();
        let [_id, _status, weight, unit] = fields.as_slice() else {
            return Err(DecodeError::malformed(
                line,
                format!("expected 4 fields, got {}", fields.len()),
            ));
        };

        let mut value: f64 = weight
            .parse()
            .map_err(|e| DecodeError::malformed(line, format!("{}", e)))?;

        // 只處理 g；其他單位視為已是 mg
        if *unit == GRAMS_UNIT {
            value *= 1000.0;
        }

        Ok(Reading::Weight(WeightSample::new(timestamp, value)))
    }
}

/// 測試用：每次請求回傳遞增的整數
#[derive(Debug, Clone, Default)]
pub struct DummyAdapter {
    counter: u64,
}

impl DummyAdapter {
    pub fn next_value(&mut self) -> f64 {
        self.counter += 1;
        self.counter as f64
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

#[derive(Debug, Clone)]
pub enum ProtocolAdapter {
    Denver(DenverAdapter),
    Metler(MetlerAdapter),
    Dummy(DummyAdapter),
}

impl ProtocolAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        match config.vendor {
            Vendor::Denver => ProtocolAdapter::Denver(DenverAdapter::new(config.echo_off)),
            Vendor::Metler => ProtocolAdapter::Metler(MetlerAdapter),
            Vendor::Dummy => ProtocolAdapter::Dummy(DummyAdapter::default()),
        }
    }

    pub fn vendor(&self) -> Vendor {
        match self {
            ProtocolAdapter::Denver(_) => Vendor::Denver,
            ProtocolAdapter::Metler(_) => Vendor::Metler,
            ProtocolAdapter::Dummy(_) => Vendor::Dummy,
        }
    }

    /// 開啟連線後、第一次請求前要送出的指令
    pub fn startup_commands(&self) -> &'static [&'static str] {
        match self {
            ProtocolAdapter::Denver(denver) if denver.echo_off => &[DENVER_ECHO_OFF],
            _ => &[],
        }
    }

    pub fn request_weight(&mut self) -> WeightRequest {
        match self {
            ProtocolAdapter::Denver(_) => WeightRequest::Send(DENVER_PRINT),
            ProtocolAdapter::Metler(_) => WeightRequest::Send(METLER_SEND_IMMEDIATE),
            ProtocolAdapter::Dummy(dummy) => WeightRequest::Immediate(dummy.next_value()),
        }
    }

    pub fn decode(&self, line: &RawLine, timestamp: f64) -> Result<Reading, DecodeError> {
        match self {
            ProtocolAdapter::Denver(denver) => denver.decode(line, timestamp),
            ProtocolAdapter::Metler(metler) => metler.decode(line, timestamp),
            ProtocolAdapter::Dummy(_) => Err(DecodeError::malformed(
                line,
                "dummy balance does not read lines",
            )),
        }
    }

    pub fn stop(&mut self) {
        if let ProtocolAdapter::Dummy(dummy) = self {
            dummy.reset();
        }
    }
}
