use serde::{Deserialize, Serialize};

/// Issuer side of the exchange, `Accepted`, `Rejected` and `Error` are terminal
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuerState {
    Initialized,
    ProposalReceived,
    OfferSent,
    RequestReceived,
    Issued,
    Accepted,
    Rejected,
    Error,
}

impl IssuerState {
    pub fn code(&self) -> u32 {
        match self {
            IssuerState::Initialized => 1,
            IssuerState::ProposalReceived => 2,
            IssuerState::OfferSent => 3,
            IssuerState::RequestReceived => 4,
            IssuerState::Issued => 5,
            IssuerState::Accepted => 6,
            IssuerState::Rejected => 7,
            IssuerState::Error => 8,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IssuerState::Accepted | IssuerState::Rejected | IssuerState::Error
        )
    }
}

/// Holder side of the exchange, `Accepted`, `Rejected` and `Error` are terminal
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderState {
    Initial,
    ProposalSent,
    OfferReceived,
    RequestSent,
    Accepted,
    Rejected,
    Error,
}

impl HolderState {
    pub fn code(&self) -> u32 {
        match self {
            HolderState::Initial => 1,
            HolderState::ProposalSent => 2,
            HolderState::OfferReceived => 3,
            HolderState::RequestSent => 4,
            HolderState::Accepted => 6,
            HolderState::Rejected => 7,
            HolderState::Error => 8,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HolderState::Accepted | HolderState::Rejected | HolderState::Error
        )
    }
}

/// `RevocationInfo` is recorded by the issuer for each credential issued against a revocable
/// credential definition
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RevocationInfo {
    pub rev_reg_id: String,
    pub cred_rev_id: String,
    pub tails_file: String,
}
