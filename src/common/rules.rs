//! 규칙 폼 뷰 모델
//!
//! 서버가 확인한 규칙과 운영자가 편집 중인 초안을 따로 들고 있다.
//! 자동 갱신은 없고, 다시 불러와도 편집한 필드는 덮어쓰지 않는다.

use log::{info, warn};
use std::collections::HashSet;

use crate::client::AdminApi;
use crate::types::{ApiError, RuleConfig, RuleField, RulesError};

/// 저장 결과 문구
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesMessage {
    Success(String),
    Error(String),
}

impl RulesMessage {
    pub fn text(&self) -> &str {
        match self {
            RulesMessage::Success(text) | RulesMessage::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RulesMessage::Error(_))
    }
}

/// 규칙 폼 뷰 모델
#[derive(Debug)]
pub struct RulesForm {
    api: AdminApi,
    confirmed: Option<RuleConfig>,
    draft: RuleConfig,
    edited: HashSet<RuleField>,
    saving: bool,
    load_error: Option<ApiError>,
    message: Option<RulesMessage>,
}

impl RulesForm {
    pub fn new(api: AdminApi) -> Self {
        Self {
            api,
            confirmed: None,
            draft: RuleConfig::default(),
            edited: HashSet::new(),
            saving: false,
            load_error: None,
            message: None,
        }
    }

    /// 서버에서 규칙을 불러와 반영
    pub async fn load(&mut self) -> Result<(), RulesError> {
        match self.api.rules().await {
            Ok(rules) => {
                self.apply_loaded(rules);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load rules: {}", e);
                self.load_error = Some(e.clone());
                Err(e.into())
            }
        }
    }

    /// 불러온 규칙 반영
    ///
    /// 편집하지 않은 필드만 새 값으로 바꾼다.
    pub fn apply_loaded(&mut self, rules: RuleConfig) {
        for field in RuleField::ALL {
            if !self.edited.contains(&field) {
                self.draft.set(field, rules.get(field));
            }
        }
        self.confirmed = Some(rules);
        self.load_error = None;
    }

    /// 필드 입력 반영
    ///
    /// 음이 아닌 정수가 아니면 거부하고 기존 값을 유지한다.
    pub fn set_field(&mut self, field: RuleField, input: &str) -> Result<(), RulesError> {
        let value = input.trim().parse::<u64>().map_err(|_| RulesError::InvalidNumber {
            field,
            input: input.to_string(),
        })?;

        self.draft.set(field, value);
        self.edited.insert(field);
        Ok(())
    }

    /// 초안 전체를 서버에 저장
    pub async fn save(&mut self) -> Result<(), RulesError> {
        if self.confirmed.is_none() {
            return Err(RulesError::NotLoaded);
        }

        self.saving = true;
        self.message = None;
        let draft = self.draft;
        let result = self.api.update_rules(&draft).await;
        self.saving = false;

        match result {
            Ok(()) => {
                info!("Rules updated: {:?}", draft);
                self.confirmed = Some(draft);
                self.edited.clear();
                self.message = Some(RulesMessage::Success("Rules updated successfully".to_string()));
                Ok(())
            }
            Err(e) => {
                warn!("Failed to update rules: {}", e);
                self.message = Some(RulesMessage::Error(format!("Failed to update rules: {}", e)));
                Err(e.into())
            }
        }
    }

    pub fn draft(&self) -> &RuleConfig {
        &self.draft
    }

    pub fn confirmed(&self) -> Option<&RuleConfig> {
        self.confirmed.as_ref()
    }

    pub fn value(&self, field: RuleField) -> u64 {
        self.draft.get(field)
    }

    /// 저장되지 않은 변경이 있는지
    pub fn is_dirty(&self) -> bool {
        self.confirmed.as_ref() != Some(&self.draft)
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn is_loaded(&self) -> bool {
        self.confirmed.is_some()
    }

    pub fn load_error(&self) -> Option<&ApiError> {
        self.load_error.as_ref()
    }

    pub fn message(&self) -> Option<&RulesMessage> {
        self.message.as_ref()
    }
}
