//! Error model shared by every command.

use inquire::InquireError;
use thiserror::Error;

/// Result type used across the crate.
pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Input rejected before anything is sent to the backend.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("prompt error: {0}")]
    Prompt(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::UnexpectedResponse(msg.into())
    }

    /// Message shown to office staff. Mirrors the notifications of the web front end.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Http(_) => "เชื่อมต่อ API ไม่สำเร็จ".to_string(),
            AppError::Api { message, .. } if message.is_empty() => {
                "เกิดข้อผิดพลาด: ไม่สามารถบันทึกได้".to_string()
            }
            AppError::Api { message, .. } => format!("เกิดข้อผิดพลาด: {}", message),
            AppError::UnexpectedResponse(_) | AppError::Json(_) => {
                "เซิร์ฟเวอร์ตอบกลับไม่ถูกต้อง".to_string()
            }
            AppError::Template(e) => format!("สร้างเอกสารสำหรับพิมพ์ไม่สำเร็จ: {}", e),
            AppError::Io(e) => format!("เขียนไฟล์ไม่สำเร็จ: {}", e),
            AppError::Config(e) => format!("การตั้งค่าไม่ถูกต้อง: {}", e),
            AppError::Cancelled => "ยกเลิกแล้ว".to_string(),
            AppError::Prompt(e) => format!("รับข้อมูลไม่สำเร็จ: {}", e),
        }
    }
}

impl From<InquireError> for AppError {
    fn from(err: InquireError) -> Self {
        match err {
            InquireError::OperationCanceled | InquireError::OperationInterrupted => {
                AppError::Cancelled
            }
            other => AppError::Prompt(other.to_string()),
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
