//! Event projection tests.
//!
//! These tests verify that:
//! 1. Each event kind produces the expected rows
//! 2. Redelivery of the same log is absorbed, including after later events
//!    and after a restart
//! 3. Distinct logs with identical arguments each leave a history row
//! 4. Stake rows keep `endTime = startTime + stakeDuration`

mod common;

use alloy_primitives::{Address, U256};
use common::*;
use stakewatch::{
    id, ContractEvent, ContractPauseToggle, Disposition, EventRouter, FaultPolicy, GlobalState,
    Nft, NftContract, NftContractAddition, NftContractRemoval, NftOwnership, NftStaked,
    NftTransfer, NftUnstaked, OwnershipTransfer, Stake, StakeDuration, StakingDurationAddition,
    StakingDurationRemoval, StateStore, Table, User,
};

fn transfer_ownership(block: u64, new_owner: Address) -> stakewatch::IndexedEvent {
    at(
        block,
        0,
        ContractEvent::OwnershipTransferred {
            previous_owner: owner(),
            new_owner,
        },
    )
}

fn transfer_nft(block: u64, to: Address, token_id: u64) -> stakewatch::IndexedEvent {
    at(
        block,
        0,
        ContractEvent::NftTransfer {
            from: Address::ZERO,
            to,
            token_id: U256::from(token_id),
        },
    )
}

fn current_owner<S: StateStore>(router: &EventRouter<S>) -> stakewatch::EntityId {
    let state: GlobalState = router.store().require(&id::global_state_id(&staking())).unwrap();
    state.owner_id
}

fn collateral_owner<S: StateStore>(router: &EventRouter<S>, token_id: u64) -> stakewatch::EntityId {
    let row: NftOwnership = router
        .store()
        .require(&id::nft_ownership_id(U256::from(token_id)))
        .unwrap();
    row.owner_id
}

// =============================================================================
// STAKE LIFECYCLE
// =============================================================================

#[test]
fn test_stake_then_unstake() {
    let mut router = test_router(FaultPolicy::Halt);
    let contract = address(0xcc);
    let staker = address(0x77);

    router
        .route(&at_time(10, 0, 1000, staked(contract, 7, staker, 604_800, 42)))
        .unwrap();

    let stake: Stake = router.store().require(&id::stake_id(U256::from(42))).unwrap();
    assert_eq!(stake.start_time, 1000);
    assert_eq!(stake.end_time, 605_800);
    assert_eq!(stake.stake_duration, 604_800);
    assert!(stake.is_staked);
    assert_eq!(stake.nft_contract_id, id::nft_contract_id(&contract));
    assert_eq!(stake.nft_id, id::nft_id(&contract, U256::from(7)));
    assert_eq!(stake.staker_id, id::user_id(&staker));
    assert_eq!(stake.duration_id, id::duration_id(604_800));
    assert!(stake.unstake_tx_id.is_none());

    router.route(&at_time(20, 0, 2000, unstaked(42))).unwrap();

    let after: Stake = router.store().require(&id::stake_id(U256::from(42))).unwrap();
    assert!(!after.is_staked);
    assert_eq!(after.start_time, 1000);
    assert_eq!(after.end_time, 605_800);
    assert_eq!(after.end_time, after.start_time + after.stake_duration);

    let unstakes: Vec<NftUnstaked> = router.store().scan().unwrap();
    assert_eq!(unstakes.len(), 1);
    assert_eq!(after.unstake_tx_id, Some(unstakes[0].id));
    assert_eq!(unstakes[0].block_timestamp, 2000);

    let stakes: Vec<NftStaked> = router.store().scan().unwrap();
    assert_eq!(stakes.len(), 1);
    assert_eq!(stakes[0].id, after.stake_tx_id);
    assert_eq!(stakes[0].stake_id, after.id);

    let user: User = router.store().require(&id::user_id(&staker)).unwrap();
    assert_eq!(user.address, staker);
}

#[test]
fn test_stakes_by_same_staker_share_user_row() {
    let mut router = test_router(FaultPolicy::Halt);
    let staker = address(0x77);

    router.route(&at(10, 0, staked(address(0xcc), 1, staker, 100, 1))).unwrap();
    router.route(&at(10, 1, staked(address(0xcc), 2, staker, 100, 2))).unwrap();

    // owner from bootstrap + staker
    assert_eq!(router.store().row_count(Table::User), 2);
    assert_eq!(router.store().row_count(Table::Stake), 2);
}

// =============================================================================
// REDELIVERY
// =============================================================================

#[test]
fn test_redelivered_stake_is_absorbed() {
    let mut router = test_router(FaultPolicy::Halt);
    let event = at_time(10, 3, 1000, staked(address(0xcc), 7, address(0x77), 604_800, 42));

    assert_eq!(router.route(&event).unwrap(), Disposition::Applied);
    let before: Stake = router.store().require(&id::stake_id(U256::from(42))).unwrap();

    assert_eq!(router.route(&event).unwrap(), Disposition::Duplicate);
    let after: Stake = router.store().require(&id::stake_id(U256::from(42))).unwrap();

    assert_eq!(before, after);
    assert_eq!(router.store().row_count(Table::NftStaked), 1);
    assert_eq!(router.store().row_count(Table::Stake), 1);
    assert_eq!(router.stats().duplicates, 1);
}

#[test]
fn test_redelivered_unstake_is_absorbed() {
    let mut router = test_router(FaultPolicy::Halt);
    router.route(&at(10, 0, staked(address(0xcc), 7, address(0x77), 100, 42))).unwrap();

    let unstake = at(11, 0, unstaked(42));
    assert_eq!(router.route(&unstake).unwrap(), Disposition::Applied);
    assert_eq!(router.route(&unstake).unwrap(), Disposition::Duplicate);

    assert_eq!(router.store().row_count(Table::NftUnstaked), 1);
}

#[test]
fn test_redelivered_whitelist_is_absorbed() {
    let mut router = test_router(FaultPolicy::Halt);
    let event = at(5, 0, ContractEvent::NftContractWhitelisted { nft_contract: address(0xcc) });

    router.route(&event).unwrap();
    router.route(&event).unwrap();

    assert_eq!(router.store().row_count(Table::NftContract), 1);
    assert_eq!(router.store().row_count(Table::NftContractAddition), 1);
}

#[test]
fn test_distinct_logs_with_same_arguments() {
    let mut router = test_router(FaultPolicy::Halt);

    router
        .route(&at(5, 0, ContractEvent::StakingDurationAdded { duration: 604_800 }))
        .unwrap();
    router
        .route(&at(6, 0, ContractEvent::StakingDurationAdded { duration: 604_800 }))
        .unwrap();

    let durations: Vec<StakeDuration> = router.store().scan().unwrap();
    assert_eq!(durations.len(), 1);
    assert!(durations[0].is_active);
    assert_eq!(durations[0].id, id::duration_id(604_800));

    let additions: Vec<StakingDurationAddition> = router.store().scan().unwrap();
    assert_eq!(additions.len(), 2);
    assert_ne!(additions[0].id, additions[1].id);
    assert!(additions.iter().all(|a| a.duration_id == durations[0].id));
}

#[test]
fn test_redelivered_ownership_transfer_is_absorbed() {
    let mut router = test_router(FaultPolicy::Halt);
    let event = transfer_ownership(10, address(0x99));

    assert_eq!(router.route(&event).unwrap(), Disposition::Applied);
    assert_eq!(router.route(&event).unwrap(), Disposition::Duplicate);

    assert_eq!(current_owner(&router), id::user_id(&address(0x99)));
    assert_eq!(router.store().row_count(Table::OwnershipTransfer), 1);
}

#[test]
fn test_ownership_transfer_redelivered_after_later_event() {
    let mut router = test_router(FaultPolicy::Halt);
    let event = transfer_ownership(10, address(0x99));

    router.route(&event).unwrap();
    router.route(&at(11, 0, ContractEvent::Paused)).unwrap();

    assert_eq!(router.route(&event).unwrap(), Disposition::Duplicate);
    assert_eq!(current_owner(&router), id::user_id(&address(0x99)));
    assert_eq!(router.lane(&staking()).unwrap().cursor().unwrap().block_number, 11);
}

#[test]
fn test_stale_ownership_transfer_after_restart() {
    let mut router = test_router(FaultPolicy::Halt);
    let first = transfer_ownership(10, address(0xaa));
    router.route(&first).unwrap();
    router.route(&transfer_ownership(20, address(0xbb))).unwrap();

    // A fresh router has no cursors; the stored history row still matches
    let mut router =
        EventRouter::new(router.into_store(), staking(), collateral(), FaultPolicy::Halt).unwrap();
    assert_eq!(router.route(&first).unwrap(), Disposition::Duplicate);

    assert_eq!(current_owner(&router), id::user_id(&address(0xbb)));
    assert_eq!(router.store().row_count(Table::OwnershipTransfer), 2);
}

#[test]
fn test_redelivered_nft_transfer_is_absorbed() {
    let mut router = test_router(FaultPolicy::Halt);
    let event = transfer_nft(10, address(0x10), 3);

    assert_eq!(router.route(&event).unwrap(), Disposition::Applied);
    assert_eq!(router.route(&event).unwrap(), Disposition::Duplicate);

    assert_eq!(collateral_owner(&router, 3), id::user_id(&address(0x10)));
    assert_eq!(router.store().row_count(Table::NftTransfer), 1);
}

#[test]
fn test_nft_transfer_redelivered_after_later_event() {
    let mut router = test_router(FaultPolicy::Halt);
    let event = transfer_nft(10, address(0x10), 3);

    router.route(&event).unwrap();
    router.route(&transfer_nft(11, address(0x20), 4)).unwrap();

    assert_eq!(router.route(&event).unwrap(), Disposition::Duplicate);
    assert_eq!(collateral_owner(&router, 3), id::user_id(&address(0x10)));
}

#[test]
fn test_stale_nft_transfer_after_restart() {
    let mut router = test_router(FaultPolicy::Halt);
    let first = transfer_nft(10, address(0x10), 3);
    router.route(&first).unwrap();
    router.route(&transfer_nft(20, address(0x20), 3)).unwrap();

    let mut router =
        EventRouter::new(router.into_store(), staking(), collateral(), FaultPolicy::Halt).unwrap();
    assert_eq!(router.route(&first).unwrap(), Disposition::Duplicate);

    assert_eq!(collateral_owner(&router, 3), id::user_id(&address(0x20)));
}

// =============================================================================
// ADMIN EVENTS
// =============================================================================

#[test]
fn test_whitelist_then_remove() {
    let mut router = test_router(FaultPolicy::Halt);
    let contract = address(0xcc);
    let contract_id = id::nft_contract_id(&contract);

    router
        .route(&at(5, 0, ContractEvent::NftContractWhitelisted { nft_contract: contract }))
        .unwrap();
    let row: NftContract = router.store().require(&contract_id).unwrap();
    assert!(row.is_whitelisted);

    router
        .route(&at(6, 0, ContractEvent::NftContractRemoved { nft_contract: contract }))
        .unwrap();
    let row: NftContract = router.store().require(&contract_id).unwrap();
    assert!(!row.is_whitelisted);
    assert_eq!(row.id, contract_id);

    let additions: Vec<NftContractAddition> = router.store().scan().unwrap();
    let removals: Vec<NftContractRemoval> = router.store().scan().unwrap();
    assert_eq!(additions.len(), 1);
    assert_eq!(removals.len(), 1);
    assert_eq!(additions[0].nft_contract_id, contract_id);
    assert_eq!(removals[0].nft_contract_id, contract_id);
}

#[test]
fn test_rewhitelist_after_removal() {
    let mut router = test_router(FaultPolicy::Halt);
    let contract = address(0xcc);

    router.route(&at(5, 0, ContractEvent::NftContractWhitelisted { nft_contract: contract })).unwrap();
    router.route(&at(6, 0, ContractEvent::NftContractRemoved { nft_contract: contract })).unwrap();
    router.route(&at(7, 0, ContractEvent::NftContractWhitelisted { nft_contract: contract })).unwrap();

    let row: NftContract = router.store().require(&id::nft_contract_id(&contract)).unwrap();
    assert!(row.is_whitelisted);
    assert_eq!(router.store().row_count(Table::NftContractAddition), 2);
}

#[test]
fn test_whitelist_after_erc721_recovery() {
    let mut router = test_router(FaultPolicy::Halt);
    let token = address(0xdd);

    router
        .route(&at(
            5,
            0,
            ContractEvent::Erc721TokensRecovered {
                token,
                recipient: address(0x42),
                token_id: U256::from(9),
            },
        ))
        .unwrap();
    router.route(&at(6, 0, ContractEvent::NftContractWhitelisted { nft_contract: token })).unwrap();

    let row: NftContract = router.store().require(&id::nft_contract_id(&token)).unwrap();
    assert!(row.is_whitelisted);
    assert_eq!(row.contract, token);
    assert_eq!(router.store().row_count(Table::NftContract), 1);
}

#[test]
fn test_readd_duration_after_removal() {
    let mut router = test_router(FaultPolicy::Halt);

    router.route(&at(5, 0, ContractEvent::StakingDurationAdded { duration: 3600 })).unwrap();
    router.route(&at(6, 0, ContractEvent::StakingDurationRemoved { duration: 3600 })).unwrap();
    router.route(&at(7, 0, ContractEvent::StakingDurationAdded { duration: 3600 })).unwrap();

    let row: StakeDuration = router.store().require(&id::duration_id(3600)).unwrap();
    assert!(row.is_active);
    assert_eq!(router.store().row_count(Table::StakeDuration), 1);
    assert_eq!(router.store().row_count(Table::StakingDurationAddition), 2);
}

#[test]
fn test_duration_add_remove() {
    let mut router = test_router(FaultPolicy::Halt);

    router.route(&at(5, 0, ContractEvent::StakingDurationAdded { duration: 3600 })).unwrap();
    router.route(&at(6, 0, ContractEvent::StakingDurationRemoved { duration: 3600 })).unwrap();

    let row: StakeDuration = router.store().require(&id::duration_id(3600)).unwrap();
    assert!(!row.is_active);
    assert_eq!(row.duration, 3600);

    let removals: Vec<StakingDurationRemoval> = router.store().scan().unwrap();
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0].block_number, 6);
}

#[test]
fn test_pause_sequence() {
    let mut router = test_router(FaultPolicy::Halt);

    router.route(&at(5, 0, ContractEvent::Paused)).unwrap();
    router.route(&at(6, 0, ContractEvent::Unpaused)).unwrap();
    router.route(&at(7, 0, ContractEvent::Paused)).unwrap();

    let state: GlobalState = router.store().require(&id::global_state_id(&staking())).unwrap();
    assert!(state.is_paused);

    let toggles: Vec<ContractPauseToggle> = router.store().scan().unwrap();
    let flags: Vec<(u64, bool)> = toggles.iter().map(|t| (t.block_number, t.is_paused)).collect();
    assert_eq!(flags, vec![(5, true), (6, false), (7, true)]);
}

#[test]
fn test_ownership_transfer_to_new_user() {
    let mut router = test_router(FaultPolicy::Halt);
    let new_owner = address(0x99);
    let before: GlobalState = router.store().require(&id::global_state_id(&staking())).unwrap();
    let users_before = router.store().row_count(Table::User);

    router
        .route(&at(5, 0, ContractEvent::OwnershipTransferred { previous_owner: owner(), new_owner }))
        .unwrap();

    let after: GlobalState = router.store().require(&id::global_state_id(&staking())).unwrap();
    assert_eq!(after.owner_id, id::user_id(&new_owner));
    assert_eq!(after.is_paused, before.is_paused);
    assert_eq!(after.min_stake_duration, before.min_stake_duration);
    assert_eq!(after.max_stake_duration, before.max_stake_duration);
    assert_eq!(router.store().row_count(Table::User), users_before + 1);

    let user: User = router.store().require(&id::user_id(&new_owner)).unwrap();
    assert_eq!(user.address, new_owner);

    let transfers: Vec<OwnershipTransfer> = router.store().scan().unwrap();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].previous_owner, owner());
    assert_eq!(transfers[0].new_owner_id, user.id);
    assert_eq!(transfers[0].block_number, 5);
}

// =============================================================================
// RECOVERY AND COLLATERAL
// =============================================================================

#[test]
fn test_erc721_recovery_creates_dimension_rows() {
    let mut router = test_router(FaultPolicy::Halt);
    let token = address(0xdd);
    let recipient = address(0x42);

    router
        .route(&at(
            5,
            0,
            ContractEvent::Erc721TokensRecovered {
                token,
                recipient,
                token_id: U256::from(9),
            },
        ))
        .unwrap();

    let contract: NftContract = router.store().require(&id::nft_contract_id(&token)).unwrap();
    assert!(!contract.is_whitelisted);
    let nft: Nft = router.store().require(&id::nft_id(&token, U256::from(9))).unwrap();
    assert_eq!(nft.nft_contract_id, contract.id);
    assert_eq!(nft.token_id, U256::from(9));
    assert_eq!(router.store().row_count(Table::Erc721TokenRecovered), 1);
    assert!(router.store().get::<User>(&id::user_id(&recipient)).unwrap().is_some());
}

#[test]
fn test_erc721_recovery_keeps_whitelisted_flag() {
    let mut router = test_router(FaultPolicy::Halt);
    let token = address(0xdd);

    router.route(&at(5, 0, ContractEvent::NftContractWhitelisted { nft_contract: token })).unwrap();
    router
        .route(&at(
            6,
            0,
            ContractEvent::Erc721TokensRecovered {
                token,
                recipient: address(0x42),
                token_id: U256::from(9),
            },
        ))
        .unwrap();

    let contract: NftContract = router.store().require(&id::nft_contract_id(&token)).unwrap();
    assert!(contract.is_whitelisted);
}

#[test]
fn test_eth_and_erc20_recovery() {
    let mut router = test_router(FaultPolicy::Halt);
    let recipient = address(0x42);

    router
        .route(&at(5, 0, ContractEvent::EthRecovered { recipient, amount: U256::from(10) }))
        .unwrap();
    router
        .route(&at(
            5,
            1,
            ContractEvent::Erc20TokensRecovered {
                token: address(0xee),
                recipient,
                amount: U256::from(10),
            },
        ))
        .unwrap();

    assert_eq!(router.store().row_count(Table::EthRecovered), 1);
    assert_eq!(router.store().row_count(Table::Erc20TokenRecovered), 1);
    let erc20: Vec<stakewatch::Erc20TokenRecovered> = router.store().scan().unwrap();
    assert_eq!(erc20[0].token_contract_address, address(0xee));
    assert_eq!(erc20[0].recipient_id, id::user_id(&recipient));
}

#[test]
fn test_collateral_transfer_overwrites_owner() {
    let mut router = test_router(FaultPolicy::Halt);
    let token_id = U256::from(3);

    router
        .route(&at(5, 0, ContractEvent::NftTransfer { from: address(0), to: address(0x10), token_id }))
        .unwrap();
    router
        .route(&at(6, 0, ContractEvent::NftTransfer { from: address(0x10), to: address(0x20), token_id }))
        .unwrap();

    let ownership: NftOwnership = router.store().require(&id::nft_ownership_id(token_id)).unwrap();
    assert_eq!(ownership.owner_id, id::user_id(&address(0x20)));
    assert_eq!(ownership.nft_token_id, token_id);
    assert_eq!(router.store().row_count(Table::NftOwnership), 1);
    assert!(router.store().get::<User>(&id::user_id(&address(0x10))).unwrap().is_some());

    let transfers: Vec<NftTransfer> = router.store().scan().unwrap();
    assert_eq!(transfers.len(), 2);
    assert_eq!(transfers[1].from, address(0x10));
    assert_eq!(transfers[1].to_id, id::user_id(&address(0x20)));
    assert!(transfers.iter().all(|t| t.nft_ownership_id == ownership.id));
}
