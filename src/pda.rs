// ==============================
// src/pda.rs (canonical seeds)
// ==============================
#![forbid(unsafe_code)]

use solana_program::pubkey::Pubkey;

pub const SEED_SALE: &[u8] = b"sale";
pub const SEED_WHITELIST: &[u8] = b"whitelist";
pub const SEED_PURCHASE: &[u8] = b"purchase";

/// One sale per (authority, token_mint) pair.
pub fn derive_sale_pda(
    program_id: &Pubkey,
    authority: &Pubkey,
    token_mint: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            SEED_SALE,
            authority.as_ref(),
            token_mint.as_ref(),
        ],
        program_id,
    )
}

pub fn derive_whitelist_pda(
    program_id: &Pubkey,
    sale_pda: &Pubkey,
    user: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            SEED_WHITELIST,
            sale_pda.as_ref(),
            user.as_ref(),
        ],
        program_id,
    )
}

pub fn derive_purchase_pda(
    program_id: &Pubkey,
    sale_pda: &Pubkey,
    buyer: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            SEED_PURCHASE,
            sale_pda.as_ref(),
            buyer.as_ref(),
        ],
        program_id,
    )
}
