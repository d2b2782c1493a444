//! Integration test: full organizer / admin / participant flow against the
//! simulated contract.

use alloy_primitives::{Address, U256};
use cenft_chain::{
    ChainConfig, ChainError, ContractSimulator, MemorySessionStore, WalletConnector,
};
use cenft_shared::{EventStatus, Route};

const CONTRACT: Address = Address::repeat_byte(0xc0);

fn admin() -> Address {
    Address::repeat_byte(0xad)
}

fn participant() -> Address {
    Address::repeat_byte(0x11)
}

fn config() -> ChainConfig {
    ChainConfig {
        contract_address: CONTRACT,
        ..ChainConfig::default()
    }
}

fn simulator() -> ContractSimulator {
    ContractSimulator::new(CONTRACT)
        .with_account(admin())
        .with_account(participant())
        .with_admin(admin())
}

#[tokio::test]
async fn test_create_approve_check_in() {
    let sim = simulator();
    let now = sim.timestamp();
    let mut wallet = WalletConnector::new(Some(&sim), MemorySessionStore::default(), config());

    // Organizer (also an admin) creates and approves
    assert_eq!(wallet.connect().await, Ok(admin()));
    let contract = wallet.contract().unwrap();
    assert!(contract.is_admin(admin()).await.unwrap());
    assert!(!contract.is_admin(participant()).await.unwrap());

    let receipt = contract
        .create_event("RustConf", "annual meetup", now - 10, now + 3_600, 2)
        .await
        .unwrap();
    assert!(receipt.status);
    assert_eq!(contract.get_event_count().await, Ok(U256::from(1)));

    let event = contract.get_event(U256::from(1)).await.unwrap();
    assert_eq!(event.status, EventStatus::Pending);
    assert_eq!(event.organizer, admin());
    assert_eq!(event.remaining_capacity(), 2);

    contract.approve_event(event.id).await.unwrap();
    let event = contract.get_event(event.id).await.unwrap();
    assert_eq!(event.status, EventStatus::Approved);
    assert!(event.is_open_at(now));

    // The check-in link travels as a route
    let link = Route::check_in(event.id.to::<u64>(), event.qr_code_hash.clone()).url("https://cenft.app");
    let Route::CheckIn { event_id, qr_code_hash } =
        Route::parse(link.trim_start_matches("https://cenft.app")).unwrap()
    else {
        panic!("expected check-in route");
    };

    // Participant checks in
    sim.switch_account(participant());
    wallet.disconnect();
    assert_eq!(wallet.connect().await, Ok(participant()));
    let contract = wallet.contract().unwrap();

    let receipt = contract
        .check_in(U256::from(event_id), &qr_code_hash)
        .await
        .unwrap();
    assert_eq!(receipt.logs.len(), 1);
    let log = cenft_chain::EventParser::parse_log(&receipt.logs[0]).unwrap();
    assert_eq!(log.participant, participant());
    assert_eq!(log.token_id, U256::from(1));

    let tokens = contract.get_user_nfts().await.unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].token_id, U256::from(1));
    assert_eq!(tokens[0].metadata.name(), Some("RustConf #1"));
    assert_eq!(tokens[0].metadata.description(), Some("annual meetup"));

    let event = contract.get_event(U256::from(event_id)).await.unwrap();
    assert_eq!(event.current_participants, 1);
}

#[tokio::test]
async fn test_reverts_propagate() {
    let sim = simulator();
    let now = sim.timestamp();
    sim.switch_account(participant());
    let mut wallet = WalletConnector::new(Some(&sim), MemorySessionStore::default(), config());
    wallet.connect().await.unwrap();
    let contract = wallet.contract().unwrap();

    contract
        .create_event("Meetup", "", now - 10, now + 10, 5)
        .await
        .unwrap();

    // Not an admin
    assert!(matches!(
        contract.approve_event(U256::from(1)).await,
        Err(ChainError::Reverted { .. })
    ));

    // Not approved yet
    let event = contract.get_event(U256::from(1)).await.unwrap();
    assert!(matches!(
        contract.check_in(event.id, &event.qr_code_hash).await,
        Err(ChainError::Reverted { .. })
    ));

    // Unknown event reads fail verbatim with the provider's error
    assert!(matches!(
        contract.get_event(U256::from(9)).await,
        Err(ChainError::Provider(_))
    ));

    // Invalid parameters
    assert!(matches!(
        contract.create_event("Backwards", "", now, now - 1, 5).await,
        Err(ChainError::Reverted { .. })
    ));
}

#[tokio::test]
async fn test_check_in_rules() {
    let sim = simulator();
    let now = sim.timestamp();
    let mut wallet = WalletConnector::new(Some(&sim), MemorySessionStore::default(), config());
    wallet.connect().await.unwrap();

    let contract = wallet.contract().unwrap();
    contract.create_event("Tiny", "", now - 10, now + 10, 1).await.unwrap();
    contract.approve_event(U256::from(1)).await.unwrap();
    let event = contract.get_event(U256::from(1)).await.unwrap();

    assert!(matches!(
        contract.check_in(event.id, "wrong-code").await,
        Err(ChainError::Reverted { .. })
    ));
    contract.check_in(event.id, &event.qr_code_hash).await.unwrap();
    assert!(matches!(
        contract.check_in(event.id, &event.qr_code_hash).await,
        Err(ChainError::Reverted { .. })
    ));

    // Cap reached for everyone else
    sim.switch_account(participant());
    wallet.disconnect();
    wallet.connect().await.unwrap();
    let contract = wallet.contract().unwrap();
    assert!(matches!(
        contract.check_in(event.id, &event.qr_code_hash).await,
        Err(ChainError::Reverted { .. })
    ));

    let event = contract.get_event(event.id).await.unwrap();
    assert!(event.is_full());
    assert_eq!(contract.balance_of(admin()).await, Ok(U256::from(1)));
    assert_eq!(contract.balance_of(participant()).await, Ok(U256::ZERO));
}

#[tokio::test]
async fn test_check_in_window() {
    let sim = simulator();
    let now = sim.timestamp();
    let mut wallet = WalletConnector::new(Some(&sim), MemorySessionStore::default(), config());
    wallet.connect().await.unwrap();

    let contract = wallet.contract().unwrap();
    contract.create_event("Later", "", now + 100, now + 200, 10).await.unwrap();
    contract.approve_event(U256::from(1)).await.unwrap();
    let event = contract.get_event(U256::from(1)).await.unwrap();

    assert!(matches!(
        contract.check_in(event.id, &event.qr_code_hash).await,
        Err(ChainError::Reverted { .. })
    ));

    sim.set_timestamp(now + 150);
    contract.check_in(event.id, &event.qr_code_hash).await.unwrap();
}

#[tokio::test]
async fn test_rejected_event_refuses_check_in() {
    let sim = simulator();
    let now = sim.timestamp();
    let mut wallet = WalletConnector::new(Some(&sim), MemorySessionStore::default(), config());

    // Organized by a participant without admin rights
    sim.switch_account(participant());
    wallet.connect().await.unwrap();
    let contract = wallet.contract().unwrap();
    contract.create_event("Spam", "", now - 10, now + 10, 5).await.unwrap();
    assert!(matches!(
        contract.reject_event(U256::from(1)).await,
        Err(ChainError::Reverted { .. })
    ));
    assert_eq!(
        contract.get_event(U256::from(1)).await.unwrap().status,
        EventStatus::Pending
    );

    // Admin rejects
    sim.switch_account(admin());
    wallet.disconnect();
    wallet.connect().await.unwrap();
    let contract = wallet.contract().unwrap();
    contract.reject_event(U256::from(1)).await.unwrap();

    let event = contract.get_event(U256::from(1)).await.unwrap();
    assert_eq!(event.status, EventStatus::Rejected);
    assert!(!event.is_open_at(now));

    // Reviews are final
    assert!(matches!(
        contract.approve_event(event.id).await,
        Err(ChainError::Reverted { .. })
    ));
    assert!(matches!(
        contract.check_in(event.id, &event.qr_code_hash).await,
        Err(ChainError::Reverted { .. })
    ));
    assert_eq!(contract.get_event(event.id).await.unwrap().current_participants, 0);
}

#[tokio::test]
async fn test_revert_carries_receipt() {
    let sim = simulator();
    let mut wallet = WalletConnector::new(Some(&sim), MemorySessionStore::default(), config());
    wallet.connect().await.unwrap();
    let contract = wallet.contract().unwrap();

    let Err(ChainError::Reverted { tx_hash, receipt }) = contract.approve_event(U256::from(7)).await
    else {
        panic!("expected a reverted transaction");
    };

    assert!(!receipt.status);
    assert!(receipt.logs.is_empty());
    assert!(receipt.gas_used > 0);
    assert_eq!(tx_hash, format!("0x{}", alloy_primitives::hex::encode(receipt.transaction_hash)));
}
