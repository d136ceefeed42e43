use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::AppError;
use crate::domain::types::OutputMode;

use super::path_builder::OUTPUT_ROOT;
use super::template::SEED_SENTINEL;

static TRAILING_SEED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|/)\[seed-auto\]$").expect("trailing seed regex"));

/// フォルダ操作の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderOutcome {
    Opened,
    /// フォルダがまだ存在しない（作成するか呼び出し側が決める）
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum FolderError {
    #[error("Backend not available: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("{0}")]
    Backend(String),
}

impl From<FolderError> for AppError {
    fn from(e: FolderError) -> Self {
        match e {
            FolderError::Unreachable(_) => AppError::folder("Backend not available"),
            FolderError::Backend(msg) => AppError::folder(msg),
        }
    }
}

/// フォルダ操作エンドポイント
#[async_trait]
pub trait FolderClient: Send + Sync {
    async fn open_folder(&self, path: &str) -> Result<FolderOutcome, FolderError>;
    async fn create_and_open_folder(&self, path: &str) -> Result<FolderOutcome, FolderError>;
}

#[derive(Serialize)]
struct FolderRequest<'a> {
    path: &'a str,
}

#[derive(Deserialize)]
struct FolderResponse {
    #[serde(default)]
    success: bool,
    error: Option<String>,
}

/// ComfyUI サーバーの `/flowpath/*` ルートを呼ぶクライアント
pub struct HttpFolderClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFolderClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FolderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, route: &str, path: &str) -> Result<FolderOutcome, FolderError> {
        let url = format!("{}/flowpath/{route}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&FolderRequest { path })
            .send()
            .await?;

        let status = response.status();
        let body: FolderResponse = response.json().await.map_err(|e| {
            FolderError::Backend(format!("Invalid response from {route} ({status}): {e}"))
        })?;
        interpret(body)
    }
}

fn interpret(body: FolderResponse) -> Result<FolderOutcome, FolderError> {
    match body.error.as_deref() {
        Some("not_found") => Ok(FolderOutcome::NotFound),
        Some(msg) => Err(FolderError::Backend(msg.to_string())),
        None if body.success => Ok(FolderOutcome::Opened),
        None => Err(FolderError::Backend("Unknown error".to_string())),
    }
}

#[async_trait]
impl FolderClient for HttpFolderClient {
    async fn open_folder(&self, path: &str) -> Result<FolderOutcome, FolderError> {
        self.post("open_folder", path).await
    }

    async fn create_and_open_folder(&self, path: &str) -> Result<FolderOutcome, FolderError> {
        self.post("create_and_open_folder", path).await
    }
}

/// プレビューのコピー用パスから、開くべきフォルダを求める
///
/// saveImage ではファイル名プレフィックスを落とす。最後のフォルダがシードなら
/// 落とせるが、それ以外の位置にシードがあるパスは開けない。
pub fn folder_target(copyable_path: &str, mode: OutputMode) -> Result<String, AppError> {
    let mut target = copyable_path.to_string();

    if mode == OutputMode::SaveImage {
        if let Some(pos) = target.rfind('/') {
            target.truncate(pos);
        }
        if target.is_empty() {
            target = OUTPUT_ROOT.to_string();
        }
    }

    match target.matches(SEED_SENTINEL).count() {
        0 => Ok(target),
        1 if TRAILING_SEED_RE.is_match(&target) => {
            let stripped = TRAILING_SEED_RE.replace(&target, "").into_owned();
            Ok(if stripped.is_empty() {
                OUTPUT_ROOT.to_string()
            } else {
                stripped
            })
        }
        _ => Err(AppError::folder("Cannot open: seed is in middle of path")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorCode;

    #[test]
    fn test_save_image_strips_prefix() {
        assert_eq!(
            folder_target("output/Characters/Umbrael", OutputMode::SaveImage).unwrap(),
            "output/Characters"
        );
        assert_eq!(
            folder_target("output/Umbrael", OutputMode::SaveImage).unwrap(),
            "output"
        );
        assert_eq!(
            folder_target("output/ComfyUI", OutputMode::SaveImage).unwrap(),
            "output"
        );
    }

    #[test]
    fn test_image_saver_keeps_full_path() {
        assert_eq!(
            folder_target("output/Characters/Umbrael", OutputMode::ImageSaver).unwrap(),
            "output/Characters/Umbrael"
        );
    }

    #[test]
    fn test_trailing_seed_is_stripped() {
        assert_eq!(
            folder_target("output/Characters/[seed-auto]", OutputMode::ImageSaver).unwrap(),
            "output/Characters"
        );
        assert_eq!(
            folder_target("output/Characters/[seed-auto]/Umbrael", OutputMode::SaveImage).unwrap(),
            "output/Characters"
        );
        assert_eq!(
            folder_target("output/[seed-auto]", OutputMode::ImageSaver).unwrap(),
            "output"
        );
    }

    #[test]
    fn test_seed_in_middle_is_rejected() {
        let err = folder_target("output/[seed-auto]/Umbrael", OutputMode::ImageSaver).unwrap_err();
        assert_eq!(err.code, ErrorCode::Folder);
        assert_eq!(err.message, "Cannot open: seed is in middle of path");

        let err =
            folder_target("output/[seed-auto]/Umbrael/[seed-auto]", OutputMode::ImageSaver)
                .unwrap_err();
        assert_eq!(err.code, ErrorCode::Folder);
    }

    #[test]
    fn test_seed_inside_custom_component_is_rejected() {
        let err = folder_target("output/run_[seed-auto]", OutputMode::ImageSaver).unwrap_err();
        assert_eq!(err.message, "Cannot open: seed is in middle of path");
    }

    #[test]
    fn test_interpret_responses() {
        let parse = |raw: &str| interpret(serde_json::from_str(raw).unwrap());
        assert_eq!(parse(r#"{"success":true}"#).unwrap(), FolderOutcome::Opened);
        assert_eq!(parse(r#"{"error":"not_found"}"#).unwrap(), FolderOutcome::NotFound);
        assert!(matches!(
            parse(r#"{"error":"Permission denied"}"#),
            Err(FolderError::Backend(msg)) if msg == "Permission denied"
        ));
        assert!(parse("{}").is_err());
    }

    #[test]
    fn test_backend_error_maps_to_folder_code() {
        let err: AppError = FolderError::Backend("boom".into()).into();
        assert_eq!(err.code, ErrorCode::Folder);
        assert_eq!(err.message, "boom");
    }
}
