//! `presentation` implements both roles of the proof exchange
//!
//! The `Verifier` requests a proof, the `Prover` builds a presentation from the credentials of its
//! wallet. The verification is delegated to the crypto capability, the verifier only orchestrates
//! the resolution of every schema and credential definition referenced by the presentation.
mod prover;
pub mod types;
mod verifier;

pub use prover::Prover;
pub use types::{ProverState, VerificationResult, VerifierState};
pub use verifier::Verifier;
