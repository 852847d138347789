// ==============================
// src/instruction.rs
// ==============================
#![forbid(unsafe_code)]

use borsh::{BorshDeserialize, BorshSerialize};

#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub enum SaleInstruction {
    /// Initialize(price, max_per_wallet, total_supply)
    /// Creates the sale state account; the signing payer becomes authority.
    Initialize {
        price: u64,
        max_per_wallet: u64,
        total_supply: u64,
    },

    /// add_to_whitelist()
    /// Admits the user passed as an account; authority-only.
    AddToWhitelist,

    /// buy_tokens(amount: u64)
    BuyTokens {
        amount: u64,
    },
}
