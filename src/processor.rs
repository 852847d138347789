// ==============================
// src/processor.rs (dispatch + gate order)
// ==============================
#![forbid(unsafe_code)]

use borsh::BorshDeserialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, system_program,
    sysvar::Sysvar,
};

use spl_token::state::Account as TokenAccount;

use crate::{
    error::SaleError,
    instruction::SaleInstruction,
    pda,
    state::{
        PurchaseRecord, SaleState, WhitelistEntry, PURCHASE_RECORD_SIZE, SALE_STATE_SIZE,
        STATE_VERSION, WHITELIST_ENTRY_SIZE,
    },
};

pub struct Processor;

impl Processor {
    pub fn process(program_id: &Pubkey, accounts: &[AccountInfo], ix_data: &[u8]) -> ProgramResult {
        let ix = SaleInstruction::try_from_slice(ix_data).map_err(|_| SaleError::InvalidInstruction)?;
        match ix {
            SaleInstruction::Initialize { price, max_per_wallet, total_supply } =>
                Self::initialize(program_id, accounts, price, max_per_wallet, total_supply),
            SaleInstruction::AddToWhitelist => Self::add_to_whitelist(program_id, accounts),
            SaleInstruction::BuyTokens { amount } => Self::buy_tokens(program_id, accounts, amount),
        }
    }

    // ---------------------------------------------------------------------
    // initialize(price, max_per_wallet, total_supply)
    // Accounts:
    // 0 [signer, writable] authority (payer; becomes sale authority)
    // 1 [writable] sale_state (PDA, uninitialized)
    // 2 []         token_mint
    // 3 []         payment_mint
    // 4 []         token_vault     (authority must be sale PDA)
    // 5 []         proceeds_vault  (authority must be the sale authority)
    // 6 []         token_program
    // 7 []         system_program
    // ---------------------------------------------------------------------
    fn initialize(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        price: u64,
        max_per_wallet: u64,
        total_supply: u64,
    ) -> ProgramResult {
        if price == 0 {
            return Err(SaleError::InvalidPrice.into());
        }
        if max_per_wallet == 0 {
            return Err(SaleError::InvalidWalletLimit.into());
        }
        if total_supply == 0 {
            return Err(SaleError::InvalidSupply.into());
        }

        let acc_iter = &mut accounts.iter();
        let authority_ai = next_account_info(acc_iter)?;
        let sale_ai = next_account_info(acc_iter)?;
        let token_mint_ai = next_account_info(acc_iter)?;
        let payment_mint_ai = next_account_info(acc_iter)?;
        let token_vault_ai = next_account_info(acc_iter)?;
        let proceeds_vault_ai = next_account_info(acc_iter)?;
        let token_program_ai = next_account_info(acc_iter)?;
        let system_program_ai = next_account_info(acc_iter)?;

        if !authority_ai.is_signer {
            return Err(SaleError::UnauthorizedCaller.into());
        }
        Self::validate_token_program(token_program_ai)?;
        if system_program_ai.key != &system_program::ID {
            return Err(SaleError::InvalidInstruction.into());
        }

        let (sale_pda, bump) =
            pda::derive_sale_pda(program_id, authority_ai.key, token_mint_ai.key);
        if sale_ai.key != &sale_pda {
            return Err(SaleError::InvalidPda.into());
        }

        // Re-initialization is rejected, not merged.
        if sale_ai.owner == program_id || sale_ai.data_len() != 0 {
            return Err(SaleError::SaleAlreadyInitialized.into());
        }
        if sale_ai.owner != &system_program::ID {
            return Err(SaleError::InvalidSaleAccount.into());
        }

        // Vault bindings are fixed here and enforced on every purchase.
        Self::validate_token_account_mint(token_vault_ai, token_mint_ai.key)?;
        Self::validate_token_account_authority(token_vault_ai, &sale_pda)?;
        Self::validate_token_account_mint(proceeds_vault_ai, payment_mint_ai.key)?;
        Self::validate_token_account_authority(proceeds_vault_ai, authority_ai.key)?;

        let rent = Rent::get()?;
        let lamports = rent.minimum_balance(SALE_STATE_SIZE);

        invoke_signed(
            &system_instruction::create_account(
                authority_ai.key,
                sale_ai.key,
                lamports,
                SALE_STATE_SIZE as u64,
                program_id,
            ),
            &[authority_ai.clone(), sale_ai.clone(), system_program_ai.clone()],
            &[&[
                pda::SEED_SALE,
                authority_ai.key.as_ref(),
                token_mint_ai.key.as_ref(),
                &[bump],
            ]],
        )?;

        let sale = SaleState {
            version: STATE_VERSION,
            bump,
            authority: *authority_ai.key,
            token_mint: *token_mint_ai.key,
            payment_mint: *payment_mint_ai.key,
            token_vault: *token_vault_ai.key,
            proceeds_vault: *proceeds_vault_ai.key,
            price,
            max_per_wallet,
            total_supply,
            total_sold: 0,
            reserved_padding: [0u8; 6],
        };
        sale.pack(&mut sale_ai.try_borrow_mut_data()?)?;

        msg!("sale initialized: supply={} cap={} price={}", total_supply, max_per_wallet, price);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // add_to_whitelist()
    // Accounts:
    // 0 []         sale_state (PDA)
    // 1 [writable] whitelist_entry (PDA, uninitialized)
    // 2 [signer, writable] authority (payer; must equal sale.authority)
    // 3 []         user (address being admitted)
    // 4 []         system_program
    // ---------------------------------------------------------------------
    fn add_to_whitelist(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let sale_ai = next_account_info(acc_iter)?;
        let entry_ai = next_account_info(acc_iter)?;
        let authority_ai = next_account_info(acc_iter)?;
        let user_ai = next_account_info(acc_iter)?;
        let system_program_ai = next_account_info(acc_iter)?;

        if system_program_ai.key != &system_program::ID {
            return Err(SaleError::InvalidInstruction.into());
        }

        if sale_ai.owner != program_id {
            return Err(SaleError::InvalidSaleAccount.into());
        }
        let sale = SaleState::unpack(&sale_ai.try_borrow_data()?)?;

        let (sale_pda, bump) =
            pda::derive_sale_pda(program_id, &sale.authority, &sale.token_mint);
        if sale_ai.key != &sale_pda || sale.bump != bump {
            return Err(SaleError::InvalidPda.into());
        }

        // Capability check: only the stored authority may admit users.
        if !authority_ai.is_signer {
            return Err(SaleError::UnauthorizedCaller.into());
        }
        if authority_ai.key != &sale.authority {
            return Err(SaleError::UnauthorizedCaller.into());
        }

        let (entry_pda, entry_bump) =
            pda::derive_whitelist_pda(program_id, &sale_pda, user_ai.key);
        if entry_ai.key != &entry_pda {
            return Err(SaleError::InvalidPda.into());
        }

        if entry_ai.owner == program_id {
            return Err(SaleError::AlreadyWhitelisted.into());
        }
        if entry_ai.owner != &system_program::ID || entry_ai.data_len() != 0 {
            return Err(SaleError::InvalidWhitelistAccount.into());
        }

        let rent = Rent::get()?;
        let lamports = rent.minimum_balance(WHITELIST_ENTRY_SIZE);

        invoke_signed(
            &system_instruction::create_account(
                authority_ai.key,
                entry_ai.key,
                lamports,
                WHITELIST_ENTRY_SIZE as u64,
                program_id,
            ),
            &[authority_ai.clone(), entry_ai.clone(), system_program_ai.clone()],
            &[&[
                pda::SEED_WHITELIST,
                sale_pda.as_ref(),
                user_ai.key.as_ref(),
                &[entry_bump],
            ]],
        )?;

        let entry = WhitelistEntry {
            version: STATE_VERSION,
            bump: entry_bump,
            sale: sale_pda,
            user: *user_ai.key,
            reserved_padding: [0u8; 6],
        };
        entry.pack(&mut entry_ai.try_borrow_mut_data()?)?;

        msg!("whitelisted: {}", user_ai.key);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // buy_tokens(amount)
    // Accounts:
    // 0 [writable] sale_state (PDA)
    // 1 []         whitelist_entry (PDA)
    // 2 [writable] purchase_record (PDA; may be uninitialized, created here)
    // 3 [signer, writable] buyer (payer for PurchaseRecord creation)
    // 4 [writable] buyer_payment_ata
    // 5 [writable] proceeds_vault
    // 6 [writable] token_vault
    // 7 [writable] buyer_token_ata
    // 8 []         token_program
    // 9 []         system_program
    //
    // Gate order is fixed: whitelist, then supply, then wallet cap. Any
    // failure aborts the transaction with zero state change.
    // ---------------------------------------------------------------------
    fn buy_tokens(program_id: &Pubkey, accounts: &[AccountInfo], amount: u64) -> ProgramResult {
        if amount == 0 {
            return Err(SaleError::InvalidAmount.into());
        }

        let acc_iter = &mut accounts.iter();
        let sale_ai = next_account_info(acc_iter)?;
        let entry_ai = next_account_info(acc_iter)?;
        let record_ai = next_account_info(acc_iter)?;
        let buyer_ai = next_account_info(acc_iter)?;
        let buyer_payment_ata_ai = next_account_info(acc_iter)?;
        let proceeds_vault_ai = next_account_info(acc_iter)?;
        let token_vault_ai = next_account_info(acc_iter)?;
        let buyer_token_ata_ai = next_account_info(acc_iter)?;
        let token_program_ai = next_account_info(acc_iter)?;
        let system_program_ai = next_account_info(acc_iter)?;

        Self::validate_token_program(token_program_ai)?;
        if system_program_ai.key != &system_program::ID {
            return Err(SaleError::InvalidInstruction.into());
        }
        if !buyer_ai.is_signer {
            return Err(SaleError::UnauthorizedCaller.into());
        }

        if sale_ai.owner != program_id {
            return Err(SaleError::InvalidSaleAccount.into());
        }
        let mut sale = SaleState::unpack(&sale_ai.try_borrow_data()?)?;

        let (sale_pda, bump) =
            pda::derive_sale_pda(program_id, &sale.authority, &sale.token_mint);
        if sale_ai.key != &sale_pda || sale.bump != bump {
            return Err(SaleError::InvalidPda.into());
        }

        // Gate 1: admission. Existence of the entry account is the decision.
        let (entry_pda, entry_bump) =
            pda::derive_whitelist_pda(program_id, &sale_pda, buyer_ai.key);
        if entry_ai.key != &entry_pda {
            return Err(SaleError::InvalidPda.into());
        }
        if entry_ai.owner != program_id {
            return Err(SaleError::NotWhitelisted.into());
        }
        let entry = WhitelistEntry::unpack(&entry_ai.try_borrow_data()?)?;
        if entry.bump != entry_bump {
            return Err(SaleError::InvalidPda.into());
        }
        if &entry.sale != sale_ai.key || &entry.user != buyer_ai.key {
            return Err(SaleError::InvalidWhitelistAccount.into());
        }

        // Gate 2: supply.
        let new_total_sold = sale
            .total_sold
            .checked_add(amount)
            .ok_or(SaleError::ArithmeticOverflow)?;
        if new_total_sold > sale.total_supply {
            return Err(SaleError::SupplyExceeded.into());
        }

        // Gate 3: per-wallet cap. prior = 0 when no record exists yet.
        let (record_pda, record_bump) =
            pda::derive_purchase_pda(program_id, &sale_pda, buyer_ai.key);
        if record_ai.key != &record_pda {
            return Err(SaleError::InvalidPda.into());
        }
        let prior = if record_ai.owner == program_id {
            let existing = PurchaseRecord::unpack(&record_ai.try_borrow_data()?)?;
            if existing.bump != record_bump {
                return Err(SaleError::InvalidPda.into());
            }
            if &existing.sale != sale_ai.key || &existing.buyer != buyer_ai.key {
                return Err(SaleError::InvalidPurchaseAccount.into());
            }
            existing.amount_purchased
        } else {
            if record_ai.owner != &system_program::ID || record_ai.data_len() != 0 {
                return Err(SaleError::InvalidPurchaseAccount.into());
            }
            0
        };
        let new_purchased = prior
            .checked_add(amount)
            .ok_or(SaleError::ArithmeticOverflow)?;
        if new_purchased > sale.max_per_wallet {
            return Err(SaleError::WalletLimitExceeded.into());
        }

        // Vault substitution defense: only the accounts bound at Initialize.
        if token_vault_ai.key != &sale.token_vault {
            return Err(SaleError::InvalidVaultAccount.into());
        }
        if proceeds_vault_ai.key != &sale.proceeds_vault {
            return Err(SaleError::InvalidVaultAccount.into());
        }
        Self::validate_token_account_mint(token_vault_ai, &sale.token_mint)?;
        Self::validate_token_account_authority(token_vault_ai, &sale_pda)?;
        Self::validate_token_account_mint(proceeds_vault_ai, &sale.payment_mint)?;
        Self::validate_token_account_mint(buyer_payment_ata_ai, &sale.payment_mint)?;
        Self::validate_token_account_mint(buyer_token_ata_ai, &sale.token_mint)?;

        let payment = amount
            .checked_mul(sale.price)
            .ok_or(SaleError::ArithmeticOverflow)?;

        // Create the purchase record on first buy (payer = buyer).
        if record_ai.owner != program_id {
            let rent = Rent::get()?;
            let lamports = rent.minimum_balance(PURCHASE_RECORD_SIZE);

            invoke_signed(
                &system_instruction::create_account(
                    buyer_ai.key,
                    record_ai.key,
                    lamports,
                    PURCHASE_RECORD_SIZE as u64,
                    program_id,
                ),
                &[buyer_ai.clone(), record_ai.clone(), system_program_ai.clone()],
                &[&[
                    pda::SEED_PURCHASE,
                    sale_pda.as_ref(),
                    buyer_ai.key.as_ref(),
                    &[record_bump],
                ]],
            )?;
        }

        // State mutation before CPI; a failed transfer reverts everything.
        sale.total_sold = new_total_sold;
        sale.pack(&mut sale_ai.try_borrow_mut_data()?)?;

        let record = PurchaseRecord {
            version: STATE_VERSION,
            bump: record_bump,
            sale: sale_pda,
            buyer: *buyer_ai.key,
            amount_purchased: new_purchased,
            reserved_padding: [0u8; 6],
        };
        record.pack(&mut record_ai.try_borrow_mut_data()?)?;

        // Payment leg: buyer -> proceeds vault (buyer signs).
        Self::spl_transfer(
            token_program_ai,
            buyer_payment_ata_ai,
            proceeds_vault_ai,
            buyer_ai,
            &[],
            payment,
        )?;

        // Token leg: token vault -> buyer (sale PDA signs).
        let bump_seed = [sale.bump];
        let seeds: &[&[u8]] = &[
            pda::SEED_SALE,
            sale.authority.as_ref(),
            sale.token_mint.as_ref(),
            &bump_seed,
        ];
        let signer_seeds: &[&[&[u8]]] = &[seeds];

        Self::spl_transfer(
            token_program_ai,
            token_vault_ai,
            buyer_token_ata_ai,
            sale_ai, // authority = sale PDA account
            signer_seeds,
            amount,
        )?;

        msg!("purchase committed: amount={} total_sold={}", amount, new_total_sold);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn validate_token_program(token_program_ai: &AccountInfo) -> ProgramResult {
        if token_program_ai.key != &spl_token::id() {
            return Err(SaleError::InvalidTokenProgram.into());
        }
        Ok(())
    }

    fn validate_token_account_mint(token_ai: &AccountInfo, expected_mint: &Pubkey) -> ProgramResult {
        let ta = TokenAccount::unpack(&token_ai.try_borrow_data()?)?;
        if &ta.mint != expected_mint {
            return Err(SaleError::InvalidMint.into());
        }
        Ok(())
    }

    fn validate_token_account_authority(token_ai: &AccountInfo, expected_authority: &Pubkey) -> ProgramResult {
        let ta = TokenAccount::unpack(&token_ai.try_borrow_data()?)?;
        // SPL Token Account's "owner" field = authority
        if &ta.owner != expected_authority {
            return Err(SaleError::InvalidAuthority.into());
        }
        Ok(())
    }

    fn spl_transfer<'a>(
        token_program_ai: &AccountInfo<'a>,
        source_ai: &AccountInfo<'a>,
        dest_ai: &AccountInfo<'a>,
        authority_ai: &AccountInfo<'a>,
        signer_seeds: &[&[&[u8]]],
        amount: u64,
    ) -> ProgramResult {
        let ix = spl_token::instruction::transfer(
            token_program_ai.key,
            source_ai.key,
            dest_ai.key,
            authority_ai.key,
            &[] as &[&Pubkey],
            amount,
        )?;

        if signer_seeds.is_empty() {
            invoke(
                &ix,
                &[
                    source_ai.clone(),
                    dest_ai.clone(),
                    authority_ai.clone(),
                    token_program_ai.clone(),
                ],
            )?;
        } else {
            invoke_signed(
                &ix,
                &[
                    source_ai.clone(),
                    dest_ai.clone(),
                    authority_ai.clone(),
                    token_program_ai.clone(),
                ],
                signer_seeds,
            )?;
        }

        Ok(())
    }
}
