//! In-memory collaborators for pipeline and route tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{Candidate, CandidateId, Career, DropdownOptions, Recommendation};
use crate::scoring::{RecommendationScorer, ScoringError};
use crate::storage::{CandidateStore, StorageError};

pub struct FakeStore {
    id: String,
    careers: Vec<Career>,
    options: DropdownOptions,
    fetch_delay: Option<Duration>,
    save_missing: bool,
    fail_updates: bool,
    save_calls: AtomicU32,
    fetch_calls: AtomicU32,
    update_calls: AtomicU32,
    sectors: Mutex<Vec<String>>,
    updates: Mutex<Vec<(CandidateId, Vec<Recommendation>)>>,
}

impl FakeStore {
    /// `careers` must be a JSON array.
    pub fn new(id: &str, careers: Value) -> Self {
        let careers = match careers {
            Value::Array(items) => items,
            other => panic!("FakeStore careers must be an array, got {other}"),
        };
        let mut options = DropdownOptions::new();
        options.insert(
            "sector".to_string(),
            vec!["tech".to_string(), "health".to_string()],
        );

        Self {
            id: id.to_string(),
            careers,
            options,
            fetch_delay: None,
            save_missing: false,
            fail_updates: false,
            save_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
            update_calls: AtomicU32::new(0),
            sectors: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn without_save_operation(mut self) -> Self {
        self.save_missing = true;
        self
    }

    pub fn failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }

    pub fn save_calls(&self) -> u32 {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> u32 {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn fetched_sectors(&self) -> Vec<String> {
        self.sectors.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(CandidateId, Vec<Recommendation>)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl CandidateStore for FakeStore {
    async fn save_candidate(&self, _candidate: &Candidate) -> Result<CandidateId, StorageError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.save_missing {
            return Err(StorageError::MissingOperation {
                operation: "save_candidate".to_string(),
            });
        }
        Ok(CandidateId::new(self.id.clone()))
    }

    async fn fetch_careers(&self, sector: &str) -> Result<Vec<Career>, StorageError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.sectors.lock().unwrap().push(sector.to_string());
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.careers.clone())
    }

    async fn update_recommendations(
        &self,
        candidate_id: &CandidateId,
        recommendations: &[Recommendation],
    ) -> Result<(), StorageError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates {
            return Err(StorageError::Database(sqlx::Error::PoolTimedOut));
        }
        self.updates
            .lock()
            .unwrap()
            .push((candidate_id.clone(), recommendations.to_vec()));
        Ok(())
    }

    async fn get_dropdown_options(&self) -> Result<DropdownOptions, StorageError> {
        Ok(self.options.clone())
    }
}

/// Scripted reply for one scoring attempt.
pub enum ScoreReply {
    Ok(Value),
    Refused,
    Empty,
    Slow(Duration),
}

pub struct FakeScorer {
    replies: Mutex<VecDeque<ScoreReply>>,
    calls: AtomicU32,
    last_candidate: Mutex<Option<Candidate>>,
    alive: bool,
}

impl FakeScorer {
    pub fn replying(replies: impl IntoIterator<Item = ScoreReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: AtomicU32::new(0),
            last_candidate: Mutex::new(None),
            alive: true,
        }
    }

    pub fn down(mut self) -> Self {
        self.alive = false;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_candidate(&self) -> Option<Candidate> {
        self.last_candidate.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecommendationScorer for FakeScorer {
    async fn submit(
        &self,
        candidate: &Candidate,
        _careers: &[Career],
    ) -> Result<Vec<Recommendation>, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_candidate.lock().unwrap() = Some(candidate.clone());

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected scoring call");

        match reply {
            ScoreReply::Ok(Value::Array(recommendations)) => Ok(recommendations),
            ScoreReply::Ok(other) => panic!("scripted reply must be an array, got {other}"),
            ScoreReply::Refused => Err(ScoringError::ConnectionRefused {
                endpoint: "http://127.0.0.1:5000/recommend".to_string(),
                reason: "connection refused".to_string(),
            }),
            ScoreReply::Empty => Err(ScoringError::EmptyResponse),
            ScoreReply::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Vec::new())
            }
        }
    }

    async fn is_alive(&self) -> bool {
        self.alive
    }
}
