// ==============================
// src/error.rs
// ==============================
#![forbid(unsafe_code)]

use solana_program::program_error::ProgramError;
use thiserror::Error;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[repr(u32)]
pub enum SaleError {
    // 0–9: Instruction
    #[error("Invalid instruction")]
    InvalidInstruction = 0,

    // 10–19: Parameter validation
    #[error("Price must be positive")]
    InvalidPrice = 10,
    #[error("Wallet limit must be positive")]
    InvalidWalletLimit = 11,
    #[error("Total supply must be positive")]
    InvalidSupply = 12,
    #[error("Amount must be positive")]
    InvalidAmount = 13,

    // 20–29: Lifecycle
    #[error("Sale already initialized")]
    SaleAlreadyInitialized = 20,
    #[error("User already whitelisted")]
    AlreadyWhitelisted = 21,

    // 30–39: Purchase gates
    #[error("Buyer not whitelisted")]
    NotWhitelisted = 30,
    #[error("Purchase exceeds remaining supply")]
    SupplyExceeded = 31,
    #[error("Purchase exceeds per-wallet limit")]
    WalletLimitExceeded = 32,

    // 40–49: Auth / Accounts
    #[error("Unauthorized caller")]
    UnauthorizedCaller = 40,
    #[error("Invalid PDA")]
    InvalidPda = 41,
    #[error("Invalid token program")]
    InvalidTokenProgram = 42,
    #[error("Invalid mint")]
    InvalidMint = 43,
    #[error("Invalid authority")]
    InvalidAuthority = 44,
    #[error("Invalid vault account")]
    InvalidVaultAccount = 45,
    #[error("Invalid sale account")]
    InvalidSaleAccount = 46,
    #[error("Invalid whitelist account")]
    InvalidWhitelistAccount = 47,
    #[error("Invalid purchase record account")]
    InvalidPurchaseAccount = 48,

    // 50–59: Math
    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 50,

    // 60–69: Layout
    #[error("Invalid state version")]
    InvalidStateVersion = 60,
    #[error("Invalid account size")]
    InvalidAccountSize = 61,
}

impl From<SaleError> for ProgramError {
    fn from(e: SaleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
