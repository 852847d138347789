// ==============================
// src/state.rs (byte-exact record layouts)
// ==============================
#![forbid(unsafe_code)]

use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::error::SaleError;

pub const SALE_STATE_SIZE: usize = 200;
pub const WHITELIST_ENTRY_SIZE: usize = 72;
pub const PURCHASE_RECORD_SIZE: usize = 80;

pub const STATE_VERSION: u8 = 1;

/// Root record of a sale. `price`, `max_per_wallet` and `total_supply` are
/// fixed at Initialize; only `total_sold` is ever mutated afterwards.
/// Invariant: `total_sold <= total_supply`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaleState {
    pub version: u8,             // 0
    pub bump: u8,                // 1
    pub authority: Pubkey,       // 2..34
    pub token_mint: Pubkey,      // 34..66
    pub payment_mint: Pubkey,    // 66..98
    pub token_vault: Pubkey,     // 98..130
    pub proceeds_vault: Pubkey,  // 130..162
    pub price: u64,              // 162..170
    pub max_per_wallet: u64,     // 170..178
    pub total_supply: u64,       // 178..186
    pub total_sold: u64,         // 186..194
    pub reserved_padding: [u8; 6], // 194..200
}

impl SaleState {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        if input.len() != SALE_STATE_SIZE {
            return Err(SaleError::InvalidAccountSize.into());
        }
        let version = input[0];
        if version != STATE_VERSION {
            return Err(SaleError::InvalidStateVersion.into());
        }
        let bump = input[1];

        let authority = Pubkey::new_from_array(input[2..34].try_into().map_err(|_| SaleError::InvalidAccountSize)?);
        let token_mint = Pubkey::new_from_array(input[34..66].try_into().map_err(|_| SaleError::InvalidAccountSize)?);
        let payment_mint = Pubkey::new_from_array(input[66..98].try_into().map_err(|_| SaleError::InvalidAccountSize)?);
        let token_vault = Pubkey::new_from_array(input[98..130].try_into().map_err(|_| SaleError::InvalidAccountSize)?);
        let proceeds_vault = Pubkey::new_from_array(input[130..162].try_into().map_err(|_| SaleError::InvalidAccountSize)?);

        let price = u64::from_le_bytes(input[162..170].try_into().map_err(|_| SaleError::InvalidAccountSize)?);
        let max_per_wallet = u64::from_le_bytes(input[170..178].try_into().map_err(|_| SaleError::InvalidAccountSize)?);
        let total_supply = u64::from_le_bytes(input[178..186].try_into().map_err(|_| SaleError::InvalidAccountSize)?);
        let total_sold = u64::from_le_bytes(input[186..194].try_into().map_err(|_| SaleError::InvalidAccountSize)?);

        let reserved_padding: [u8; 6] = input[194..200].try_into().map_err(|_| SaleError::InvalidAccountSize)?;

        Ok(Self {
            version, bump, authority, token_mint, payment_mint, token_vault, proceeds_vault,
            price, max_per_wallet, total_supply, total_sold,
            reserved_padding,
        })
    }

    pub fn pack(&self, output: &mut [u8]) -> Result<(), ProgramError> {
        if output.len() != SALE_STATE_SIZE {
            return Err(SaleError::InvalidAccountSize.into());
        }
        if self.version != STATE_VERSION {
            return Err(SaleError::InvalidStateVersion.into());
        }

        output[0] = self.version;
        output[1] = self.bump;

        output[2..34].copy_from_slice(self.authority.as_ref());
        output[34..66].copy_from_slice(self.token_mint.as_ref());
        output[66..98].copy_from_slice(self.payment_mint.as_ref());
        output[98..130].copy_from_slice(self.token_vault.as_ref());
        output[130..162].copy_from_slice(self.proceeds_vault.as_ref());

        output[162..170].copy_from_slice(&self.price.to_le_bytes());
        output[170..178].copy_from_slice(&self.max_per_wallet.to_le_bytes());
        output[178..186].copy_from_slice(&self.total_supply.to_le_bytes());
        output[186..194].copy_from_slice(&self.total_sold.to_le_bytes());

        output[194..200].copy_from_slice(&self.reserved_padding);
        Ok(())
    }

    #[inline]
    pub fn remaining_supply(&self) -> u64 {
        self.total_supply.saturating_sub(self.total_sold)
    }

    #[inline]
    pub fn is_sold_out(&self) -> bool { self.total_sold == self.total_supply }
}

/// Admission record for one (sale, user) pair. Existence of the account is
/// the admission decision; immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WhitelistEntry {
    pub version: u8,     // 0
    pub bump: u8,        // 1
    pub sale: Pubkey,    // 2..34
    pub user: Pubkey,    // 34..66
    pub reserved_padding: [u8; 6], // 66..72
}

impl WhitelistEntry {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        if input.len() != WHITELIST_ENTRY_SIZE {
            return Err(SaleError::InvalidAccountSize.into());
        }
        let version = input[0];
        if version != STATE_VERSION {
            return Err(SaleError::InvalidStateVersion.into());
        }
        let bump = input[1];

        let sale = Pubkey::new_from_array(input[2..34].try_into().map_err(|_| SaleError::InvalidAccountSize)?);
        let user = Pubkey::new_from_array(input[34..66].try_into().map_err(|_| SaleError::InvalidAccountSize)?);

        let reserved_padding: [u8; 6] = input[66..72].try_into().map_err(|_| SaleError::InvalidAccountSize)?;

        Ok(Self { version, bump, sale, user, reserved_padding })
    }

    pub fn pack(&self, output: &mut [u8]) -> Result<(), ProgramError> {
        if output.len() != WHITELIST_ENTRY_SIZE {
            return Err(SaleError::InvalidAccountSize.into());
        }
        if self.version != STATE_VERSION {
            return Err(SaleError::InvalidStateVersion.into());
        }

        output[0] = self.version;
        output[1] = self.bump;

        output[2..34].copy_from_slice(self.sale.as_ref());
        output[34..66].copy_from_slice(self.user.as_ref());

        output[66..72].copy_from_slice(&self.reserved_padding);
        Ok(())
    }
}

/// Cumulative purchase total for one (sale, buyer) pair. Created lazily on
/// the first successful purchase.
/// Invariant: `amount_purchased <= sale.max_per_wallet`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseRecord {
    pub version: u8,           // 0
    pub bump: u8,              // 1
    pub sale: Pubkey,          // 2..34
    pub buyer: Pubkey,         // 34..66
    pub amount_purchased: u64, // 66..74
    pub reserved_padding: [u8; 6], // 74..80
}

impl PurchaseRecord {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        if input.len() != PURCHASE_RECORD_SIZE {
            return Err(SaleError::InvalidAccountSize.into());
        }
        let version = input[0];
        if version != STATE_VERSION {
            return Err(SaleError::InvalidStateVersion.into());
        }
        let bump = input[1];

        let sale = Pubkey::new_from_array(input[2..34].try_into().map_err(|_| SaleError::InvalidAccountSize)?);
        let buyer = Pubkey::new_from_array(input[34..66].try_into().map_err(|_| SaleError::InvalidAccountSize)?);

        let amount_purchased = u64::from_le_bytes(input[66..74].try_into().map_err(|_| SaleError::InvalidAccountSize)?);

        let reserved_padding: [u8; 6] = input[74..80].try_into().map_err(|_| SaleError::InvalidAccountSize)?;

        Ok(Self { version, bump, sale, buyer, amount_purchased, reserved_padding })
    }

    pub fn pack(&self, output: &mut [u8]) -> Result<(), ProgramError> {
        if output.len() != PURCHASE_RECORD_SIZE {
            return Err(SaleError::InvalidAccountSize.into());
        }
        if self.version != STATE_VERSION {
            return Err(SaleError::InvalidStateVersion.into());
        }

        output[0] = self.version;
        output[1] = self.bump;

        output[2..34].copy_from_slice(self.sale.as_ref());
        output[34..66].copy_from_slice(self.buyer.as_ref());

        output[66..74].copy_from_slice(&self.amount_purchased.to_le_bytes());

        output[74..80].copy_from_slice(&self.reserved_padding);
        Ok(())
    }
}
