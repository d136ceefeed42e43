use crate::domain::error::AppError;
use super::OutputTarget;

/// システムクリップボードへコピー
#[derive(Default)]
pub struct ClipboardOutput;

impl ClipboardOutput {
    pub fn new() -> Self {
        Self
    }
}

impl OutputTarget for ClipboardOutput {
    fn deliver(&self, text: &str) -> Result<(), AppError> {
        let mut ctx = arboard::Clipboard::new()
            .map_err(|e| AppError::internal(format!("クリップボード初期化失敗: {e}")))?;
        ctx.set_text(text)
            .map_err(|e| AppError::internal(format!("クリップボード書き込み失敗: {e}")))?;
        log::info!("パスをクリップボードにコピー: {text}");
        Ok(())
    }

    fn name(&self) -> &str {
        "clipboard"
    }
}
