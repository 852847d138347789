// ==============================
// src/lib.rs
// ==============================
#![deny(warnings)]
#![forbid(unsafe_code)]

pub mod entrypoint;
pub mod error;
pub mod instruction;
pub mod pda;
pub mod processor;
pub mod state;

solana_program::declare_id!("26aTyxt6EP98LRz591tPkeZksZPVMjJa5hcgN2uuF1ef");
