use agora_lib::application::ports::RetryPrompt;
use agora_lib::domain::value_objects::ToggleTarget;
use agora_lib::shared::error::AppError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// 予め決めた順に応答するリトライ確認。尽きたら拒否する。
#[derive(Default)]
pub struct ScriptedRetry {
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<(ToggleTarget, AppError)>>,
}

impl ScriptedRetry {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<(ToggleTarget, AppError)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetryPrompt for ScriptedRetry {
    async fn confirm_retry(&self, target: &ToggleTarget, error: &AppError) -> bool {
        self.prompts
            .lock()
            .unwrap()
            .push((target.clone(), error.clone()));
        self.answers.lock().unwrap().pop_front().unwrap_or(false)
    }
}
