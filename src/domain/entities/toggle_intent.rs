use serde::{Deserialize, Serialize};

/// 画面に表示する ON/OFF と件数。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ToggleSnapshot {
    pub active: bool,
    pub count: Option<i64>,
}

impl ToggleSnapshot {
    pub fn new(active: bool, count: Option<i64>) -> Self {
        Self { active, count }
    }

    pub fn flag(active: bool) -> Self {
        Self {
            active,
            count: None,
        }
    }
}

/// 1 エンティティ×1 閲覧者ぶんの楽観的トグル状態。
///
/// - `desired`: ユーザーが最後に要求した状態
/// - `server_confirmed`: 永続化が確認できている状態
/// - `request_in_flight`: 書き込みリクエストが未完了かどうか
///
/// 件数はサーバー確定値（`confirmed_count`）だけを保持し、表示値は
/// `desired` と `server_confirmed` の差分から都度導出する。これにより
/// 失敗時の巻き戻しは `desired` を戻すだけで件数も一緒に戻る。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleIntentState {
    desired: bool,
    server_confirmed: bool,
    request_in_flight: bool,
    confirmed_count: Option<i64>,
}

impl ToggleIntentState {
    pub fn new(initial: ToggleSnapshot) -> Self {
        Self {
            desired: initial.active,
            server_confirmed: initial.active,
            request_in_flight: false,
            confirmed_count: initial.count,
        }
    }

    pub fn desired(&self) -> bool {
        self.desired
    }

    pub fn server_confirmed(&self) -> bool {
        self.server_confirmed
    }

    pub fn request_in_flight(&self) -> bool {
        self.request_in_flight
    }

    pub fn is_settled(&self) -> bool {
        self.desired == self.server_confirmed && !self.request_in_flight
    }

    pub fn has_diverged(&self) -> bool {
        self.desired != self.server_confirmed
    }

    pub fn display(&self) -> ToggleSnapshot {
        let delta = i64::from(self.desired) - i64::from(self.server_confirmed);
        ToggleSnapshot {
            active: self.desired,
            count: self.confirmed_count.map(|count| (count + delta).max(0)),
        }
    }

    /// ユーザー操作で `desired` を反転し、新しい値を返す
    pub fn flip(&mut self) -> bool {
        self.desired = !self.desired;
        self.desired
    }

    pub fn set_desired(&mut self, desired: bool) {
        self.desired = desired;
    }

    /// 書き込みを開始できるなら in-flight にして書き込む値を返す。
    ///
    /// 既に in-flight、または `desired` が確定値と一致する場合は `None`。
    pub fn begin_write(&mut self) -> Option<bool> {
        if self.request_in_flight || !self.has_diverged() {
            return None;
        }
        self.request_in_flight = true;
        Some(self.desired)
    }

    pub fn complete_success(&mut self, persisted: bool) {
        if persisted != self.server_confirmed {
            let delta = i64::from(persisted) - i64::from(self.server_confirmed);
            self.confirmed_count = self.confirmed_count.map(|count| (count + delta).max(0));
        }
        self.server_confirmed = persisted;
        self.request_in_flight = false;
    }

    /// 書き込み失敗時に表示を確定値へ巻き戻す。
    ///
    /// 巻き戻しによって取り消された意図があればその値を返す。失敗中に
    /// ユーザーが既に確定値へ戻していた場合は `None`。
    pub fn complete_failure(&mut self) -> Option<bool> {
        self.request_in_flight = false;
        if !self.has_diverged() {
            return None;
        }
        let abandoned = self.desired;
        self.desired = self.server_confirmed;
        Some(abandoned)
    }

    /// サーバーから読み直した状態を確定値として採用する
    pub fn adopt_server_state(&mut self, snapshot: ToggleSnapshot) {
        self.desired = snapshot.active;
        self.server_confirmed = snapshot.active;
        if snapshot.count.is_some() {
            self.confirmed_count = snapshot.count;
        }
    }
}
