use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::domain::error::AppError;
use crate::domain::job::{RequestInfo, RequestKind, RequestStatus};

/// フォルダ操作・プリセット再読込の既定デバウンス
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// リクエストキュー: デバウンスと、同じ (インスタンス, 種別) の古いリクエストの取り消し
///
/// 保持するのは未完了のリクエストだけ。終わったものはその場で取り除く。
pub struct RequestQueue {
    requests: Arc<Mutex<HashMap<String, RequestEntry>>>,
    debounce: Duration,
}

struct RequestEntry {
    info: RequestInfo,
    cancel_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RequestEntry {
    fn cancel(mut self) {
        self.info.status = RequestStatus::Canceled;
        log::debug!("リクエスト {} を取り消し", self.info.request_id);
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn mark_running(requests: &Mutex<HashMap<String, RequestEntry>>, request_id: &str) {
    let mut requests = requests.lock().await;
    if let Some(entry) = requests.get_mut(request_id) {
        entry.info.status = RequestStatus::Running;
    }
}

async fn finish(
    requests: &Mutex<HashMap<String, RequestEntry>>,
    request_id: &str,
    status: RequestStatus,
) {
    if requests.lock().await.remove(request_id).is_some() {
        log::debug!("リクエスト {request_id} 終了: {status:?}");
    }
}

/// 条件に合う未完了リクエストを取り出して取り消し、その ID を返す
fn cancel_where(
    requests: &mut HashMap<String, RequestEntry>,
    pred: impl Fn(&RequestInfo) -> bool,
) -> Vec<String> {
    let ids: Vec<String> = requests
        .iter()
        .filter(|(_, e)| pred(&e.info))
        .map(|(id, _)| id.clone())
        .collect();
    for id in &ids {
        if let Some(entry) = requests.remove(id) {
            entry.cancel();
        }
    }
    ids
}

impl RequestQueue {
    pub fn new(debounce: Duration) -> Self {
        Self {
            requests: Arc::new(Mutex::new(HashMap::new())),
            debounce,
        }
    }

    /// デバウンス後に `work` を実行する。
    ///
    /// 後続のリクエストに置き換えられた場合は `Ok(None)`。
    pub async fn run<T, Fut>(
        &self,
        instance_id: &str,
        kind: RequestKind,
        work: Fut,
    ) -> Result<Option<T>, AppError>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let request_id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let (result_tx, result_rx) = oneshot::channel();

        {
            let mut requests = self.requests.lock().await;
            cancel_where(&mut requests, |info| {
                info.instance_id == instance_id && info.kind == kind
            });
            requests.insert(
                request_id.clone(),
                RequestEntry {
                    info: RequestInfo::new(
                        request_id.clone(),
                        instance_id.to_string(),
                        kind,
                        now,
                    ),
                    cancel_tx: Some(cancel_tx),
                    handle: None,
                },
            );

            let tracked = self.requests.clone();
            let debounce = self.debounce;
            let id = request_id.clone();
            let handle = tokio::spawn(async move {
                tokio::select! {
                    _ = &mut cancel_rx => return,
                    _ = tokio::time::sleep(debounce) => {}
                }
                mark_running(&tracked, &id).await;

                let result = tokio::select! {
                    _ = &mut cancel_rx => return,
                    result = work => result,
                };
                let status = match &result {
                    Ok(_) => RequestStatus::Done,
                    Err(e) => {
                        log::warn!("リクエスト {id} 失敗: {e}");
                        RequestStatus::Failed
                    }
                };
                finish(&tracked, &id, status).await;
                let _ = result_tx.send(result);
            });

            // spawn したタスクはこのロックを取るまで状態を進められない
            if let Some(entry) = requests.get_mut(&request_id) {
                entry.handle = Some(handle);
            }
        }

        match result_rx.await {
            Ok(Ok(value)) => Ok(Some(value)),
            Ok(Err(e)) => Err(e),
            // 取り消されたタスクは送信側ごと破棄される
            Err(_) => Ok(None),
        }
    }

    /// インスタンスの未完了リクエストをすべて取り消す
    pub async fn cancel_instance(&self, instance_id: &str) -> Vec<String> {
        let mut requests = self.requests.lock().await;
        cancel_where(&mut requests, |info| info.instance_id == instance_id)
    }

    pub async fn get(&self, request_id: &str) -> Option<RequestInfo> {
        let requests = self.requests.lock().await;
        requests.get(request_id).map(|e| e.info.clone())
    }

    /// インスタンスの未完了リクエスト一覧（作成順）
    pub async fn list(&self, instance_id: &str) -> Vec<RequestInfo> {
        let requests = self.requests.lock().await;
        let mut infos: Vec<RequestInfo> = requests
            .values()
            .filter(|e| e.info.instance_id == instance_id)
            .map(|e| e.info.clone())
            .collect();
        infos.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        infos
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted(calls: &Arc<AtomicUsize>, value: &'static str) -> impl Future<Output = Result<&'static str, AppError>> + Send + 'static {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_after_debounce() {
        let queue = Arc::new(RequestQueue::new(Duration::from_millis(300)));
        let calls = Arc::new(AtomicUsize::new(0));

        let q = queue.clone();
        let work = counted(&calls, "done");
        let task = tokio::spawn(async move { q.run("w1", RequestKind::OpenFolder, work).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let pending = queue.list("w1").await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, RequestStatus::Pending);
        assert_eq!(
            queue.get(&pending[0].request_id).await.map(|i| i.kind),
            Some(RequestKind::OpenFolder)
        );

        assert_eq!(task.await.unwrap().unwrap(), Some("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(queue.list("w1").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_request_supersedes_older() {
        let queue = Arc::new(RequestQueue::new(Duration::from_millis(300)));
        let calls = Arc::new(AtomicUsize::new(0));

        let q = queue.clone();
        let work = counted(&calls, "first");
        let first = tokio::spawn(async move { q.run("w1", RequestKind::OpenFolder, work).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = queue
            .run("w1", RequestKind::OpenFolder, counted(&calls, "second"))
            .await
            .unwrap();

        assert_eq!(first.await.unwrap().unwrap(), None);
        assert_eq!(second, Some("second"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(queue.list("w1").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_kinds_and_instances_are_independent() {
        let queue = Arc::new(RequestQueue::new(Duration::from_millis(300)));
        let calls = Arc::new(AtomicUsize::new(0));

        let q1 = queue.clone();
        let w1 = counted(&calls, "open");
        let open = tokio::spawn(async move { q1.run("w1", RequestKind::OpenFolder, w1).await });
        let q2 = queue.clone();
        let w2 = counted(&calls, "other");
        let other = tokio::spawn(async move { q2.run("w2", RequestKind::OpenFolder, w2).await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let refresh = queue
            .run("w1", RequestKind::RefreshPresets, counted(&calls, "refresh"))
            .await
            .unwrap();

        assert_eq!(open.await.unwrap().unwrap(), Some("open"));
        assert_eq!(other.await.unwrap().unwrap(), Some("other"));
        assert_eq!(refresh, Some("refresh"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_returned() {
        let queue = RequestQueue::new(Duration::from_millis(10));
        let err = queue
            .run("w1", RequestKind::CreateFolder, async {
                Err::<(), _>(AppError::folder("Backend not available"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.message, "Backend not available");
        assert!(queue.list("w1").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_requests_are_not_retained() {
        let queue = RequestQueue::new(Duration::from_millis(10));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..50 {
            queue
                .run("w1", RequestKind::OpenFolder, counted(&calls, "open"))
                .await
                .unwrap();
            queue
                .run("w1", RequestKind::RefreshPresets, counted(&calls, "refresh"))
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 100);
        assert!(queue.list("w1").await.is_empty());
        assert!(queue.requests.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_instance() {
        let queue = Arc::new(RequestQueue::new(Duration::from_secs(5)));
        let calls = Arc::new(AtomicUsize::new(0));

        let q = queue.clone();
        let work = counted(&calls, "never");
        let task = tokio::spawn(async move { q.run("w1", RequestKind::OpenFolder, work).await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(queue.cancel_instance("w1").await.len(), 1);
        assert_eq!(task.await.unwrap().unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(queue.list("w1").await.is_empty());
        assert!(queue.cancel_instance("w1").await.is_empty());
    }
}
