use serde::Serialize;

/// リクエスト状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// デバウンス待ち
    Pending,
    Running,
    Done,
    Failed,
    /// 後続リクエストに置き換えられた
    Canceled,
}

/// リクエスト種別（同一ウィジェット・同一種別は直近の1件だけが走る）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    OpenFolder,
    CreateFolder,
    RefreshPresets,
}

/// リクエストメタデータ
#[derive(Debug, Clone, Serialize)]
pub struct RequestInfo {
    pub request_id: String,
    /// 発行元ウィジェットのインスタンスID
    pub instance_id: String,
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub created_at: String,
}

impl RequestInfo {
    pub fn new(request_id: String, instance_id: String, kind: RequestKind, now: String) -> Self {
        Self {
            request_id,
            instance_id,
            kind,
            status: RequestStatus::Pending,
            created_at: now,
        }
    }
}
