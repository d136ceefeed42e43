#[cfg(feature = "clipboard")]
mod clipboard;

#[cfg(feature = "clipboard")]
pub use clipboard::ClipboardOutput;

use parking_lot::Mutex;

use crate::domain::error::AppError;

/// プレビューパスのコピー先
pub trait OutputTarget: Send + Sync {
    fn deliver(&self, text: &str) -> Result<(), AppError>;
    fn name(&self) -> &str;
}

/// 受け取ったテキストを保持するだけの出力先
#[derive(Default)]
pub struct MemoryOutput {
    delivered: Mutex<Vec<String>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<String> {
        self.delivered.lock().last().cloned()
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().clone()
    }
}

impl OutputTarget for MemoryOutput {
    fn deliver(&self, text: &str) -> Result<(), AppError> {
        self.delivered.lock().push(text.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
