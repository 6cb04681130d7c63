use crate::core::flow::FlowError;
use crate::core::protocol::DecodeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BalanceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    SerialError(#[from] serialport::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Could not connect to serial port {port} at {baud} baud: {reason}")]
    TransportUnavailable {
        port: String,
        baud: u32,
        reason: String,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("Serial link closed")]
    LinkClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Transport,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BalanceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BalanceError::ConfigValidationError { .. }
            | BalanceError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            BalanceError::SerialError(_)
            | BalanceError::TransportUnavailable { .. }
            | BalanceError::LinkClosed => ErrorCategory::Transport,
            BalanceError::Decode(_) | BalanceError::Flow(_) => ErrorCategory::Data,
            BalanceError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單筆資料錯誤只影響一次輪詢
            BalanceError::Decode(_) | BalanceError::Flow(_) => ErrorSeverity::Low,
            BalanceError::LinkClosed => ErrorSeverity::Medium,
            BalanceError::ConfigValidationError { .. }
            | BalanceError::InvalidConfigValueError { .. }
            | BalanceError::SerialError(_)
            | BalanceError::TransportUnavailable { .. } => ErrorSeverity::High,
            BalanceError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the configuration file and command-line overrides"
            }
            ErrorCategory::Transport => {
                "Check the serial port path, baud rate and cable, then press 'c' to retry"
            }
            ErrorCategory::Data => {
                "Check the balance output format and that the poll interval is positive"
            }
            ErrorCategory::System => "Check file permissions and free disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BalanceError::TransportUnavailable { port, baud, .. } => {
                format!("Could not open the balance on {} ({} baud)", port, baud)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BalanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_orders_data_errors_lowest() {
        let decode = BalanceError::Decode(DecodeError::Malformed {
            line: "??".to_string(),
            reason: "bad".to_string(),
        });
        let transport = BalanceError::TransportUnavailable {
            port: "/dev/ttyS0".to_string(),
            baud: 9600,
            reason: "No such file or directory".to_string(),
        };

        assert_eq!(decode.category(), ErrorCategory::Data);
        assert_eq!(transport.category(), ErrorCategory::Transport);
        assert!(decode.severity() < transport.severity());
        assert!(transport
            .user_friendly_message()
            .contains("/dev/ttyS0 (9600 baud)"));
    }
}
