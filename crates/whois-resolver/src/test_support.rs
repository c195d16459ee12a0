// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Scripted provider used by unit tests

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use api_client::{ApiError, WhoisProvider};
use shared_types::WhoisRecord;

/// What a scripted provider does on its next call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Succeed,
    Fail,
}

/// Provider that follows a fixed script, then repeats a fallback step
#[derive(Debug)]
pub(crate) struct ScriptedProvider {
    name: String,
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn scripted(
        name: &str,
        steps: impl IntoIterator<Item = Step>,
        fallback: Step,
    ) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(steps.into_iter().collect()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn healthy(name: &str) -> Self {
        Self::scripted(name, [], Step::Succeed)
    }

    pub(crate) fn failing(name: &str) -> Self {
        Self::scripted(name, [], Step::Fail)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Registered-domain record whose registrar names the provider that produced it
pub(crate) fn record_from(provider: &str, domain: &str) -> WhoisRecord {
    WhoisRecord {
        registrar: provider.to_string(),
        status: vec!["clientTransferProhibited".to_string()],
        ..WhoisRecord::new(domain)
    }
}

impl WhoisProvider for ScriptedProvider {
    async fn query(&self, domain: &str) -> Result<WhoisRecord, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        match step {
            Step::Succeed => Ok(record_from(&self.name, domain)),
            Step::Fail => Err(ApiError::Http {
                message: format!("{} unreachable", self.name),
            }),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
