mod common;

use std::sync::Arc;

use serde_json::{json, Value};

use prople_agent_api::dispatcher::CommandHandle;
use prople_agent_core::capability::crypto::RevocationConfig;
use prople_agent_core::capability::wallet::RECORD_TYPE_CREDENTIAL;
use prople_agent_core::handle::Handle;
use prople_agent_core::types::AgentError;

use common::{agent, call, connected, Agent, FakeTransport, CRED_DEF_ID, SCHEMA_ID};

struct Exchange {
    transport: Arc<FakeTransport>,
    alice: Agent,
    bob: Agent,
    to_bob: Handle,
    to_alice: Handle,
    issuer: Handle,
    holder: Handle,
}

/// `offered` runs the exchange until the holder received the offer
fn offered(revocation: Option<RevocationConfig>) -> Exchange {
    let transport = Arc::new(FakeTransport::default());
    let alice = agent("alice", transport.clone());
    let bob = agent("bob", transport.clone());
    let (to_bob, to_alice) = connected(&alice, &bob);

    let cred_def = call(|reply| {
        alice
            .ctx
            .credential_def()
            .lookup(1, "degree", CRED_DEF_ID, revocation, reply)
    })
    .unwrap();

    let values = json!({"name": "bob", "degree": "maths"}).to_string();
    let issuer = call(|reply| {
        alice.ctx.issuer_credential().create(
            2,
            "degree",
            cred_def,
            &values,
            Some("degree".to_string()),
            reply,
        )
    })
    .unwrap();
    assert_eq!(alice.ctx.issuer_credential().get_state(issuer).unwrap(), 1);

    call(|reply| alice.ctx.issuer_credential().send_offer(3, issuer, to_bob, reply)).unwrap();
    assert_eq!(alice.ctx.issuer_credential().get_state(issuer).unwrap(), 3);

    let offer = alice.ctx.issuer_credential().get_credential_offer(issuer).unwrap();
    let holder = call(|reply| {
        bob.ctx
            .credential()
            .create_with_offer(4, "bob-degree", &offer, reply)
    })
    .unwrap();
    assert_eq!(bob.ctx.credential().get_state(holder).unwrap(), 3);

    let attributes: Value =
        serde_json::from_str(&bob.ctx.credential().get_attributes(holder).unwrap()).unwrap();
    assert_eq!(attributes, json!({"name": "bob", "degree": "maths"}));

    Exchange {
        transport,
        alice,
        bob,
        to_bob,
        to_alice,
        issuer,
        holder,
    }
}

fn requested(revocation: Option<RevocationConfig>) -> Exchange {
    let exchange = offered(revocation);
    let bob = &exchange.bob;

    call(|reply| {
        bob.ctx
            .credential()
            .send_request(5, exchange.holder, exchange.to_alice, reply)
    })
    .unwrap();
    assert_eq!(bob.ctx.credential().get_state(exchange.holder).unwrap(), 4);

    exchange
}

#[test]
fn test_credential_exchange() {
    let revocation = RevocationConfig {
        rev_reg_id: "rev-reg-1".to_string(),
        tails_file: "/tmp/tails".to_string(),
    };
    let exchange = requested(Some(revocation));
    let (alice, bob) = (&exchange.alice, &exchange.bob);

    let state = call(|reply| {
        alice
            .ctx
            .issuer_credential()
            .update_state(6, exchange.issuer, reply)
    })
    .unwrap();
    assert_eq!(state, 4);

    call(|reply| {
        alice
            .ctx
            .issuer_credential()
            .send_credential(7, exchange.issuer, exchange.to_bob, reply)
    })
    .unwrap();
    assert_eq!(alice.ctx.issuer_credential().get_state(exchange.issuer).unwrap(), 5);

    let info: Value = serde_json::from_str(
        &alice
            .ctx
            .issuer_credential()
            .get_revocation_info(exchange.issuer)
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(info["rev_reg_id"], "rev-reg-1");
    assert_eq!(info["cred_rev_id"], "1");

    let state = call(|reply| bob.ctx.credential().update_state(8, exchange.holder, reply)).unwrap();
    assert_eq!(state, 6);
    assert_eq!(bob.wallet.count(RECORD_TYPE_CREDENTIAL), 1);
    assert!(bob.ctx.credential().get_credential_id(exchange.holder).unwrap().is_some());

    let credential: Value =
        serde_json::from_str(&bob.ctx.credential().get_credential(exchange.holder).unwrap()).unwrap();
    assert_eq!(credential["cred_def_id"], CRED_DEF_ID);

    let state = call(|reply| {
        alice
            .ctx
            .issuer_credential()
            .update_state(9, exchange.issuer, reply)
    })
    .unwrap();
    assert_eq!(state, 6);
}

#[test]
fn test_replayed_credential_is_stored_once() {
    let exchange = requested(None);
    let (alice, bob) = (&exchange.alice, &exchange.bob);

    let snapshot = bob.ctx.credential().serialize(exchange.holder).unwrap();
    let replica = bob.ctx.credential().deserialize(&snapshot).unwrap();

    call(|reply| {
        alice
            .ctx
            .issuer_credential()
            .update_state(6, exchange.issuer, reply)
    })
    .unwrap();
    call(|reply| {
        alice
            .ctx
            .issuer_credential()
            .send_credential(7, exchange.issuer, exchange.to_bob, reply)
    })
    .unwrap();

    let credential = exchange.transport.last_sent().unwrap().payload;
    for (token, handle) in [(8, exchange.holder), (9, replica)] {
        let state = call(|reply| {
            bob.ctx
                .credential()
                .update_state_with_message(token, handle, &credential, reply)
        })
        .unwrap();
        assert_eq!(state, 6);
    }

    assert_eq!(bob.wallet.count(RECORD_TYPE_CREDENTIAL), 1);
    assert_eq!(
        bob.ctx.credential().get_credential_id(exchange.holder).unwrap(),
        bob.ctx.credential().get_credential_id(replica).unwrap()
    );

    // the stored credential is visible through a wallet search
    let search = call(|reply| {
        bob.ctx
            .wallet_search()
            .open(10, RECORD_TYPE_CREDENTIAL, "", "", reply)
    })
    .unwrap();
    assert_eq!(
        bob.ctx.wallet_search().get_record_type(search).unwrap(),
        RECORD_TYPE_CREDENTIAL
    );

    let records = call(|reply| bob.ctx.wallet_search().next(11, search, 10, reply)).unwrap();
    let records: Vec<Value> = serde_json::from_str(&records).unwrap();
    assert_eq!(records.len(), 1);

    call(|reply| bob.ctx.wallet_search().close(12, search, reply)).unwrap();
    let result = call(|reply| bob.ctx.wallet_search().next(13, search, 10, reply));
    assert!(matches!(result, Err(AgentError::InvalidHandle(_))));
}

#[test]
fn test_offer_declined_by_holder() {
    let table = vec![
        (Some(json!({"name": "bob", "degree": "physics"}).to_string()), 2, 2),
        (None, 7, 7),
    ];

    for (counter_proposal, holder_state, issuer_state) in table {
        let exchange = offered(None);
        let (alice, bob) = (&exchange.alice, &exchange.bob);

        call(|reply| {
            bob.ctx.credential().decline(
                6,
                exchange.holder,
                exchange.to_alice,
                Some("wrong degree".to_string()),
                counter_proposal.as_deref(),
                reply,
            )
        })
        .unwrap();
        assert_eq!(
            bob.ctx.credential().get_state(exchange.holder).unwrap(),
            holder_state
        );

        let state = call(|reply| {
            alice
                .ctx
                .issuer_credential()
                .update_state(7, exchange.issuer, reply)
        })
        .unwrap();
        assert_eq!(state, issuer_state);
    }
}

#[test]
fn test_create_with_invalid_arguments() {
    let transport = Arc::new(FakeTransport::default());
    let alice = agent("alice", transport);

    let cred_def = call(|reply| {
        alice
            .ctx
            .credential_def()
            .lookup(1, "degree", CRED_DEF_ID, None, reply)
    })
    .unwrap();
    assert_eq!(
        alice.ctx.credential_def().get_schema_id(cred_def).unwrap(),
        SCHEMA_ID
    );
    assert!(alice.ctx.credential_def().get_rev_reg_id(cred_def).unwrap().is_none());

    let result = alice
        .ctx
        .issuer_credential()
        .create(
            2,
            "degree",
            cred_def,
            "{not json",
            None,
            |_: CommandHandle, _: Result<Handle, AgentError>| {
                panic!("a rejected command never completes")
            },
        );
    assert!(matches!(result, Err(AgentError::InvalidInput(_))));

    let result = call(|reply| {
        alice
            .ctx
            .credential_def()
            .lookup(3, "unknown", "cred-def-404", None, reply)
    });
    assert!(matches!(result, Err(AgentError::ResolutionFailed(_))));

    let schema = call(|reply| alice.ctx.schema().lookup(4, "degree", SCHEMA_ID, reply)).unwrap();
    let attributes: Value =
        serde_json::from_str(&alice.ctx.schema().get_attributes(schema).unwrap()).unwrap();
    assert_eq!(attributes["attr_names"], json!(["name", "degree"]));

    let snapshot = alice.ctx.schema().serialize(schema).unwrap();
    let restored = alice.ctx.schema().deserialize(&snapshot).unwrap();
    assert_eq!(alice.ctx.schema().get_schema_id(restored).unwrap(), SCHEMA_ID);
    alice.ctx.schema().release(schema).unwrap();
    assert!(alice.ctx.schema().release(schema).is_err());
}
