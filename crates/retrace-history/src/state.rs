//! Immutable navigation snapshots

use serde::{Deserialize, Serialize};

use crate::stack::HistoryStack;

/// Point-in-time view of the history, published after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    pub paths: Vec<String>,
    pub current_index: usize,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub current_path: Option<String>,
    pub history_length: usize,
    pub is_navigating: bool,
}

impl NavigationState {
    pub fn capture(stack: &HistoryStack, is_navigating: bool) -> Self {
        Self {
            paths: stack.paths(),
            current_index: stack.current_index(),
            can_go_back: stack.can_go_back(),
            can_go_forward: stack.can_go_forward(),
            current_path: stack.current_path().map(str::to_string),
            history_length: stack.len(),
            is_navigating,
        }
    }
}
