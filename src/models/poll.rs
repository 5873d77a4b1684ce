// src/models/poll.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::models::context::{TenantScoped, TenantStamped};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub author_id: Option<Uuid>,
    pub question: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub opens_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closes_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl PollRow {
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.opens_at.is_none_or(|at| at <= now) && self.closes_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub text: String,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollVote {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub user_id: Uuid,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionTally {
    pub id: Uuid,
    pub text: String,
    pub votes: usize,
}

/// Enquete com opções e apuração.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub author_id: Option<Uuid>,
    pub question: String,
    pub description: Option<String>,
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub is_open: bool,
    pub options: Vec<OptionTally>,
    pub total_votes: usize,
    /// A opção escolhida por quem consulta, se já votou.
    pub my_vote: Option<Uuid>,
}

impl PollRecord {
    pub fn assemble(
        poll: PollRow,
        mut options: Vec<PollOption>,
        votes: &[PollVote],
        viewer: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        for vote in votes.iter().filter(|v| v.poll_id == poll.id) {
            *counts.entry(vote.option_id).or_default() += 1;
        }

        options.sort_by_key(|o| o.position);
        let options: Vec<OptionTally> = options
            .into_iter()
            .filter(|o| o.poll_id == poll.id)
            .map(|o| OptionTally {
                votes: counts.get(&o.id).copied().unwrap_or(0),
                id: o.id,
                text: o.text,
            })
            .collect();

        let my_vote = votes
            .iter()
            .find(|v| v.poll_id == poll.id && v.user_id == viewer)
            .map(|v| v.option_id);

        Self {
            is_open: poll.is_open_at(now),
            total_votes: options.iter().map(|o| o.votes).sum(),
            options,
            my_vote,
            id: poll.id,
            tenant_id: poll.tenant_id,
            author_id: poll.author_id,
            question: poll.question,
            description: poll.description,
            opens_at: poll.opens_at,
            closes_at: poll.closes_at,
            created_at: poll.created_at,
        }
    }
}

impl TenantScoped for PollRecord {
    fn tenant_id(&self) -> Option<Uuid> {
        Some(self.tenant_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewPoll {
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[validate(length(min = 1, message = "A pergunta é obrigatória."))]
    pub question: String,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(min = 2, message = "A enquete precisa de ao menos duas opções."))]
    pub options: Vec<String>,
    #[serde(default)]
    pub opens_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closes_at: Option<DateTime<Utc>>,
}

impl TenantStamped for NewPoll {
    fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: Uuid) {
        self.tenant_id = Some(tenant_id);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PollInsert {
    pub tenant_id: Uuid,
    pub author_id: Uuid,
    pub question: String,
    pub description: Option<String>,
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollOptionInsert {
    pub poll_id: Uuid,
    pub text: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollVoteInsert {
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opens_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closes_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastVote {
    pub option_id: Uuid,
}
