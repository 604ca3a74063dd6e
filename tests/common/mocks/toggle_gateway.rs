use agora_lib::application::ports::ToggleGateway;
use agora_lib::domain::value_objects::{ToggleTarget, ViewerId};
use agora_lib::shared::error::AppError;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Fetch(ToggleTarget),
    Insert(ToggleTarget),
    Delete(ToggleTarget),
}

/// 呼び出しを記録し、サーバー側の行をメモリ上で再現するゲートウェイ
#[derive(Default)]
pub struct RecordingToggleGateway {
    calls: Mutex<Vec<GatewayCall>>,
    rows: Mutex<HashSet<ToggleTarget>>,
    failures: Mutex<VecDeque<AppError>>,
    write_delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingToggleGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row(self, target: ToggleTarget) -> Self {
        self.rows.lock().unwrap().insert(target);
        self
    }

    /// アプリを経由せずにサーバー側の行を置き換える
    pub fn set_row(&self, target: ToggleTarget, present: bool) {
        let mut rows = self.rows.lock().unwrap();
        if present {
            rows.insert(target);
        } else {
            rows.remove(&target);
        }
    }

    /// 書き込み 1 件あたりの所要時間（tokio の仮想時間）
    pub fn with_write_delay(self, delay: Duration) -> Self {
        *self.write_delay.lock().unwrap() = delay;
        self
    }

    /// 次の書き込みを指定エラーで失敗させる
    pub fn fail_next_write(&self, error: AppError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn write_calls(&self) -> Vec<GatewayCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, GatewayCall::Fetch(_)))
            .collect()
    }

    pub fn has_row(&self, target: &ToggleTarget) -> bool {
        self.rows.lock().unwrap().contains(target)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn write(&self, call: GatewayCall) -> Result<(), AppError> {
        self.calls.lock().unwrap().push(call.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.write_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failures.lock().unwrap().pop_front();
        let result = match failure {
            Some(error) => Err(error),
            None => {
                let mut rows = self.rows.lock().unwrap();
                match call {
                    GatewayCall::Insert(target) => {
                        if rows.insert(target) {
                            Ok(())
                        } else {
                            Err(AppError::Conflict("duplicate key".into()))
                        }
                    }
                    GatewayCall::Delete(target) => {
                        if rows.remove(&target) {
                            Ok(())
                        } else {
                            Err(AppError::NotFound("no row".into()))
                        }
                    }
                    GatewayCall::Fetch(_) => Ok(()),
                }
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl ToggleGateway for RecordingToggleGateway {
    async fn fetch_presence(
        &self,
        target: &ToggleTarget,
        _viewer: &ViewerId,
    ) -> Result<bool, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push(GatewayCall::Fetch(target.clone()));
        Ok(self.has_row(target))
    }

    async fn insert_record(
        &self,
        target: &ToggleTarget,
        _viewer: &ViewerId,
    ) -> Result<(), AppError> {
        self.write(GatewayCall::Insert(target.clone())).await
    }

    async fn delete_record(
        &self,
        target: &ToggleTarget,
        _viewer: &ViewerId,
    ) -> Result<(), AppError> {
        self.write(GatewayCall::Delete(target.clone())).await
    }
}
