use serde::{Deserialize, Serialize};
use validator::Validate;

/// One candidate answer in a vote round. The round is scoped to
/// (session, slot); a new round replaces all previous options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteOption {
    pub id: String,
    pub slot: u32,
    pub text: String,
    /// How many responses this option represented when the round started.
    pub initial_count: u32,
    pub final_count: u32,
    /// Identity keys of everyone who picked this option.
    pub voters: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteOptionSpec {
    pub text: String,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RunVotingRequest {
    #[validate(length(min = 1, max = 50))]
    pub options: Vec<VoteOptionSpec>,
}

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub option_id: String,
}

#[derive(Debug, Serialize)]
pub struct VoteResults {
    pub slot: u32,
    pub options: Vec<VoteTally>,
    /// For percentage computation by the caller.
    pub participant_count: u32,
}

#[derive(Debug, Serialize)]
pub struct VoteTally {
    pub id: String,
    pub text: String,
    pub initial_count: u32,
    pub final_count: u32,
}
