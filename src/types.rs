use serde::{Deserialize, Serialize};

use crate::http::RateMeta;

/// One selectable entry in a dynamic option list. Order is preserved from
/// the upstream listing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct OptionItem {
    pub label: String,
    pub value: String,
}

impl OptionItem {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

// Shared result meta and error shapes used across action and lookup outputs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<RateMeta>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
    pub retriable: bool,
}

impl From<crate::http::ErrorInfo> for ErrorShape {
    fn from(e: crate::http::ErrorInfo) -> Self {
        Self {
            code: e.code,
            message: e.message,
            retriable: e.retriable,
        }
    }
}
