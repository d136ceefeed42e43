use serde::Serialize;

/// アプリケーション共通エラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "E_INVALID_NAME")]
    InvalidName,
    #[serde(rename = "E_PROTECTED_PRESET")]
    ProtectedPreset,
    #[serde(rename = "E_NOT_FOUND")]
    NotFound,
    #[serde(rename = "E_INVALID_STATE")]
    InvalidState,
    #[serde(rename = "E_STORAGE")]
    Storage,
    #[serde(rename = "E_SYNC")]
    Sync,
    #[serde(rename = "E_FOLDER")]
    Folder,
    #[serde(rename = "E_INTERNAL")]
    Internal,
}

/// アプリケーションエラー（UI通知ペイロード兼用）
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
}

impl AppError {
    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidName,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn protected_preset(name: &str) -> Self {
        Self {
            code: ErrorCode::ProtectedPreset,
            message: format!("Cannot modify default preset \"{name}\""),
            recoverable: true,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::NotFound,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidState,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Storage,
            message: msg.into(),
            recoverable: false,
        }
    }

    pub fn sync(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Sync,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn folder(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Folder,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            message: msg.into(),
            recoverable: false,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
