mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::{json, Value};

use prople_agent_core::handle::Handle;
use prople_agent_core::types::AgentError;

use common::{agent, call, connected, Agent, FakeTransport, CRED_DEF_ID};

struct Exchange {
    alice: Agent,
    bob: Agent,
    to_alice: Handle,
    verifier: Handle,
    prover: Handle,
}

/// `requested` runs the exchange until the prover received the proof request
fn requested() -> Exchange {
    let transport = Arc::new(FakeTransport::default());
    let alice = agent("alice", transport.clone());
    let bob = agent("bob", transport);
    let (to_bob, to_alice) = connected(&alice, &bob);

    let attrs = json!([{"name": "degree", "restrictions": [{"cred_def_id": CRED_DEF_ID}]}]);
    let predicates = json!([{"name": "age", "p_type": ">=", "p_value": 18}]);
    let verifier = call(|reply| {
        alice.ctx.proof().create(
            1,
            "degree-check",
            &attrs.to_string(),
            &predicates.to_string(),
            "",
            "degree check",
            reply,
        )
    })
    .unwrap();
    assert_eq!(alice.ctx.proof().get_state(verifier).unwrap(), 1);

    call(|reply| alice.ctx.proof().send_request(2, verifier, to_bob, reply)).unwrap();
    assert_eq!(alice.ctx.proof().get_state(verifier).unwrap(), 3);

    let request = alice.ctx.proof().get_presentation_request(verifier).unwrap();
    let prover = call(|reply| {
        bob.ctx
            .disclosed_proof()
            .create_with_request(3, "bob-degree", &request, reply)
    })
    .unwrap();
    assert_eq!(bob.ctx.disclosed_proof().get_state(prover).unwrap(), 3);

    let proof_request: Value =
        serde_json::from_str(&bob.ctx.disclosed_proof().get_request(prover).unwrap()).unwrap();
    assert_eq!(proof_request["nonce"], "987654321");

    Exchange {
        alice,
        bob,
        to_alice,
        verifier,
        prover,
    }
}

/// `present` selects the first matching credential of every referent and sends the presentation
fn present(exchange: &Exchange) {
    let (bob, prover) = (&exchange.bob, exchange.prover);

    let found = call(|reply| {
        bob.ctx
            .disclosed_proof()
            .retrieve_credentials(4, prover, reply)
    })
    .unwrap();
    let found: Value = serde_json::from_str(&found).unwrap();
    assert_eq!(bob.ctx.disclosed_proof().get_state(prover).unwrap(), 3);

    let selected = json!({
        "attrs": {
            "attribute_0": {"credential": found["attrs"]["attribute_0"][0]},
        }
    });

    call(|reply| {
        bob.ctx
            .disclosed_proof()
            .generate_presentation(5, prover, &selected.to_string(), "", reply)
    })
    .unwrap();
    assert_eq!(bob.ctx.disclosed_proof().get_state(prover).unwrap(), 4);

    call(|reply| {
        bob.ctx
            .disclosed_proof()
            .send_presentation(6, prover, exchange.to_alice, reply)
    })
    .unwrap();
    assert_eq!(bob.ctx.disclosed_proof().get_state(prover).unwrap(), 5);
}

#[test]
fn test_proof_exchange() {
    let exchange = requested();
    present(&exchange);
    let (alice, bob) = (&exchange.alice, &exchange.bob);

    let state = call(|reply| alice.ctx.proof().update_state(7, exchange.verifier, reply)).unwrap();
    assert_eq!(state, 5);
    assert_eq!(
        alice.ctx.proof().get_verification_result(exchange.verifier).unwrap(),
        1
    );

    let received: Value =
        serde_json::from_str(&alice.ctx.proof().get_presentation(exchange.verifier).unwrap()).unwrap();
    let sent: Value =
        serde_json::from_str(&bob.ctx.disclosed_proof().get_presentation(exchange.prover).unwrap())
            .unwrap();
    assert_eq!(received["presentation"], sent);

    let state = call(|reply| {
        bob.ctx
            .disclosed_proof()
            .update_state(8, exchange.prover, reply)
    })
    .unwrap();
    assert_eq!(state, 6);
}

#[test]
fn test_invalid_proof_is_not_fatal() {
    let exchange = requested();
    exchange.alice.crypto.proof_valid.store(false, Ordering::SeqCst);
    present(&exchange);

    let alice = &exchange.alice;
    let state = call(|reply| alice.ctx.proof().update_state(7, exchange.verifier, reply)).unwrap();
    assert_eq!(state, 5);
    assert_eq!(
        alice.ctx.proof().get_verification_result(exchange.verifier).unwrap(),
        2
    );
}

#[test]
fn test_unresolvable_presentation_is_fatal() {
    let exchange = requested();
    present(&exchange);

    let alice = &exchange.alice;
    alice.ledger.unreachable.store(true, Ordering::SeqCst);

    let result = call(|reply| alice.ctx.proof().update_state(7, exchange.verifier, reply));
    assert!(matches!(result, Err(AgentError::ResolutionFailed(_))));
    assert_eq!(alice.ctx.proof().get_state(exchange.verifier).unwrap(), 8);
    assert!(alice.ctx.proof().get_problem(exchange.verifier).unwrap().is_some());

    alice.ledger.unreachable.store(false, Ordering::SeqCst);
    let result = call(|reply| alice.ctx.proof().update_state(8, exchange.verifier, reply));
    assert_eq!(result.unwrap(), 8);
}

#[test]
fn test_request_declined_by_prover() {
    let table = vec![
        (
            Some(json!({"attributes": [{"name": "degree", "cred_def_id": CRED_DEF_ID}]}).to_string()),
            2,
            2,
        ),
        (None, 7, 7),
    ];

    for (counter_proposal, prover_state, verifier_state) in table {
        let exchange = requested();
        let (alice, bob) = (&exchange.alice, &exchange.bob);

        call(|reply| {
            bob.ctx.disclosed_proof().decline_request(
                4,
                exchange.prover,
                exchange.to_alice,
                Some("not now".to_string()),
                counter_proposal.as_deref(),
                reply,
            )
        })
        .unwrap();
        assert_eq!(
            bob.ctx.disclosed_proof().get_state(exchange.prover).unwrap(),
            prover_state
        );

        let state = call(|reply| alice.ctx.proof().update_state(5, exchange.verifier, reply)).unwrap();
        assert_eq!(state, verifier_state);
    }
}

#[test]
fn test_generate_with_invalid_selection() {
    let exchange = requested();
    let bob = &exchange.bob;

    let result = bob.ctx.disclosed_proof().generate_presentation(
        4,
        exchange.prover,
        "[",
        "",
        |_: u32, _: Result<(), AgentError>| panic!("a rejected command never completes"),
    );
    assert!(matches!(result, Err(AgentError::InvalidInput(_))));

    let selected = json!({"attrs": {"attribute_0": {"credential": {}}}}).to_string();
    let result = call(|reply| {
        bob.ctx
            .disclosed_proof()
            .generate_presentation(5, exchange.prover, &selected, "{}", reply)
    });
    assert!(matches!(result, Err(AgentError::InvalidInput(_))));
    assert_eq!(bob.ctx.disclosed_proof().get_state(exchange.prover).unwrap(), 3);
}
