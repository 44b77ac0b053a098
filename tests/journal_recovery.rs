//! Journal store persistence and restart tests.

mod common;

use alloy_primitives::{Address, U256};
use common::*;
use stakewatch::{
    id, indexer, CallValue, ContractEvent, Disposition, FaultPolicy, GlobalState, IndexerConfig,
    IndexerError, JournalConfig, JournalStore, Network, NftOwnership, Stake, StateStore, Table,
};
use std::fs::OpenOptions;
use std::io::Write;
use tempfile::TempDir;

fn journal_config(dir: &TempDir) -> JournalConfig {
    JournalConfig {
        path: dir.path().join("store"),
        create_if_missing: true,
        sync_on_commit: true,
    }
}

fn indexer_config(dir: &TempDir) -> IndexerConfig {
    let mut config = IndexerConfig::new(staking(), collateral(), 0, Network::Anvil);
    config.store_path = dir.path().join("store");
    config
}

#[test]
fn test_projection_survives_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let store = bootstrapped(JournalStore::create(journal_config(&dir)).unwrap());
        let mut router = indexer::router(store, &indexer_config(&dir)).unwrap();
        router.route(&at_time(10, 0, 1000, staked(address(0xcc), 7, address(0x77), 604_800, 42))).unwrap();
        router.route(&at(11, 0, ContractEvent::Paused)).unwrap();
        assert_eq!(router.store().frame_count(), 3);
    }

    let store = JournalStore::open(journal_config(&dir)).unwrap();
    assert_eq!(store.frame_count(), 3);

    let stake: Stake = store.require(&id::stake_id(U256::from(42))).unwrap();
    assert_eq!(stake.end_time, 605_800);
    let state: GlobalState = store.require(&id::global_state_id(&staking())).unwrap();
    assert!(state.is_paused);
    assert_eq!(store.row_count(Table::ContractPauseToggle), 1);
}

#[test]
fn test_transfers_redelivered_after_restart_are_absorbed() {
    let dir = TempDir::new().unwrap();
    let ownership = |block, new_owner| {
        at(block, 0, ContractEvent::OwnershipTransferred { previous_owner: owner(), new_owner })
    };
    let transfer = |block, to| {
        at(block, 0, ContractEvent::NftTransfer { from: Address::ZERO, to, token_id: U256::from(3) })
    };

    {
        let store = bootstrapped(JournalStore::create(journal_config(&dir)).unwrap());
        let mut router = indexer::router(store, &indexer_config(&dir)).unwrap();
        router.route(&ownership(10, address(0xaa))).unwrap();
        router.route(&ownership(20, address(0xbb))).unwrap();
        router.route(&transfer(10, address(0x10))).unwrap();
        router.route(&transfer(20, address(0x20))).unwrap();
    }

    let store = JournalStore::open(journal_config(&dir)).unwrap();
    let frames = store.frame_count();
    let mut router = indexer::router(store, &indexer_config(&dir)).unwrap();

    // The provider replays from an earlier block after the restart
    assert_eq!(router.route(&ownership(10, address(0xaa))).unwrap(), Disposition::Duplicate);
    assert_eq!(router.route(&transfer(10, address(0x10))).unwrap(), Disposition::Duplicate);
    assert_eq!(router.store().frame_count(), frames);

    let state: GlobalState = router.store().require(&id::global_state_id(&staking())).unwrap();
    assert_eq!(state.owner_id, id::user_id(&address(0xbb)));
    let nft: NftOwnership = router.store().require(&id::nft_ownership_id(U256::from(3))).unwrap();
    assert_eq!(nft.owner_id, id::user_id(&address(0x20)));
}

#[test]
fn test_same_address_for_both_streams_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut config = indexer_config(&dir);
    config.collateral_nft_contract = staking();

    let err = indexer::open_store(&config, &StaticReader::healthy()).unwrap_err();
    assert!(matches!(err, IndexerError::Configuration(_)));
    assert!(!dir.path().join("store").exists());
}

#[test]
fn test_torn_tail_is_discarded() {
    let dir = TempDir::new().unwrap();
    {
        bootstrapped(JournalStore::create(journal_config(&dir)).unwrap());
    }

    // A frame header promising more bytes than were written
    {
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join("store").join("state.journal"))
            .unwrap();
        file.write_all(&200u32.to_le_bytes()).unwrap();
        file.write_all(&[0xab; 17]).unwrap();
    }

    {
        let mut store = JournalStore::open(journal_config(&dir)).unwrap();
        assert_eq!(store.frame_count(), 1);
        assert!(store.get::<GlobalState>(&id::global_state_id(&staking())).unwrap().is_some());

        let mut router = indexer::router(&mut store, &indexer_config(&dir)).unwrap();
        router.route(&at(5, 0, ContractEvent::Paused)).unwrap();
    }

    let store = JournalStore::open(journal_config(&dir)).unwrap();
    assert_eq!(store.frame_count(), 2);
    let state: GlobalState = store.require(&id::global_state_id(&staking())).unwrap();
    assert!(state.is_paused);
}

#[test]
fn test_corrupt_frame_is_detected() {
    let dir = TempDir::new().unwrap();
    {
        bootstrapped(JournalStore::create(journal_config(&dir)).unwrap());
    }

    // Flip the last payload byte of the only frame
    let path = dir.path().join("store").join("state.journal");
    let mut bytes = std::fs::read(&path).unwrap();
    let last_payload = bytes.len() - 5;
    bytes[last_payload] ^= 0xff;
    std::fs::write(&path, bytes).unwrap();

    let result = JournalStore::open(journal_config(&dir));
    assert!(matches!(result, Err(IndexerError::ChecksumMismatch { .. })));
}

#[test]
fn test_bootstrap_runs_once_across_restarts() {
    let dir = TempDir::new().unwrap();
    let config = indexer_config(&dir);

    {
        let store = indexer::open_store(&config, &StaticReader::healthy()).unwrap();
        assert_eq!(store.frame_count(), 1);
    }

    // A reader that would fail is never consulted once state exists
    let failing = StaticReader {
        results: vec![Err("node unavailable".into()), Ok(CallValue::Uint(U256::from(1))), Ok(CallValue::Address(Address::ZERO))],
    };
    let store = indexer::open_store(&config, &failing).unwrap();
    assert_eq!(store.frame_count(), 1);

    let state: GlobalState = store.require(&id::global_state_id(&staking())).unwrap();
    assert_eq!(state.owner_id, id::user_id(&owner()));
    assert_eq!(state.min_stake_duration, MIN_DURATION);
}

#[test]
fn test_failed_bootstrap_leaves_store_empty() {
    let dir = TempDir::new().unwrap();
    let config = indexer_config(&dir);
    let failing = StaticReader {
        results: vec![
            Ok(CallValue::Uint(U256::from(1))),
            Ok(CallValue::Uint(U256::from(2))),
            Err("execution reverted".into()),
        ],
    };

    let err = indexer::open_store(&config, &failing).unwrap_err();
    assert!(matches!(err, IndexerError::BootstrapRead(_)));

    let store = JournalStore::open(journal_config(&dir)).unwrap();
    assert_eq!(store.frame_count(), 0);
    assert_eq!(store.row_count(Table::GlobalState), 0);
    assert_eq!(store.row_count(Table::User), 0);
}

#[test]
fn test_skip_policy_from_config() {
    let dir = TempDir::new().unwrap();
    let mut config = indexer_config(&dir);
    config.fault_policy = FaultPolicy::Skip;

    let store = indexer::open_store(&config, &StaticReader::healthy()).unwrap();
    let mut router = indexer::router(store, &config).unwrap();
    router.route(&at(5, 0, unstaked(3))).unwrap();
    assert_eq!(router.stats().skipped, 1);
    assert_eq!(router.store().frame_count(), 1);
}
